//! In-phase workflow against real local git repositories.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use prhook_core::hosting::fakes::{pull_request, MemoryHostingClient};
use prhook_core::{
    CliGit, GitBackend, HookError, InParams, Materializer, Result, SidecarStore, Source, Version,
};

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Upstream repository with a default branch and `refs/pull/1/head`.
struct Upstream {
    dir: tempfile::TempDir,
}

impl Upstream {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        let upstream = Self { dir };
        upstream.push_to_pull(1, "first change");
        upstream
    }

    fn url(&self) -> String {
        format!("file://{}", self.dir.path().display())
    }

    /// Commit on top of the pull head and move `refs/pull/<n>/head` to it.
    fn push_to_pull(&self, number: u64, message: &str) -> String {
        let head_ref = format!("refs/pull/{number}/head");
        let parent = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &head_ref])
            .current_dir(self.dir.path())
            .output()
            .unwrap();
        let parent = if parent.status.success() {
            String::from_utf8_lossy(&parent.stdout).trim().to_string()
        } else {
            run_git(self.dir.path(), &["rev-parse", "HEAD"])
        };
        let tree = run_git(self.dir.path(), &["rev-parse", &format!("{parent}^{{tree}}")]);
        let sha = run_git(
            self.dir.path(),
            &["commit-tree", &tree, "-p", &parent, "-m", message],
        );
        run_git(self.dir.path(), &["update-ref", &head_ref, &sha]);
        sha
    }
}

fn source() -> Source {
    Source {
        access_token: "token".to_string(),
        repository: "octo/widgets".to_string(),
        trigger_phrase: "/deploy".to_string(),
        allow_all_users: true,
        ..Source::default()
    }
}

fn version(commit: &str) -> Version {
    Version {
        pr: "1".to_string(),
        commit: commit.to_string(),
        comment_id: "42".to_string(),
        comment: "/deploy".to_string(),
        commented_at: None,
    }
}

fn head_of(dir: &Path) -> String {
    run_git(dir, &["rev-parse", "HEAD"])
}

fn branch_of(dir: &Path) -> String {
    run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

#[tokio::test]
async fn clones_and_pins_pull_request_head() {
    let upstream = Upstream::new();
    let sha = run_git(upstream.dir.path(), &["rev-parse", "refs/pull/1/head"]);
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", &sha, &upstream.url()));
    let git = CliGit::anonymous();
    let dest = tempfile::tempdir().unwrap();
    let mut diag = Vec::new();

    let metadata = Materializer::new(&client, &git)
        .materialize(&source(), &version(&sha), &InParams::default(), dest.path(), &mut diag)
        .await
        .unwrap();

    assert_eq!(head_of(dest.path()), sha);
    assert_eq!(branch_of(dest.path()), "feature");
    assert_eq!(metadata.get("head_sha"), Some(sha.as_str()));
    assert_eq!(metadata.get("head_name"), Some("feature"));

    let store = SidecarStore::new(dest.path());
    assert_eq!(store.read_version().unwrap(), version(&sha));
    assert_eq!(store.read_metadata().unwrap(), metadata);
    assert_eq!(
        std::fs::read_to_string(store.dir().join("comment")).unwrap(),
        "/deploy"
    );
    assert!(String::from_utf8_lossy(&diag).contains("> git clone"));
}

#[tokio::test]
async fn rerun_reuses_existing_checkout() {
    let upstream = Upstream::new();
    let sha = run_git(upstream.dir.path(), &["rev-parse", "refs/pull/1/head"]);
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", &sha, &upstream.url()));
    let git = CliGit::anonymous();
    let materializer = Materializer::new(&client, &git);
    let dest = tempfile::tempdir().unwrap();

    let first = materializer
        .materialize(&source(), &version(&sha), &InParams::default(), dest.path(), &mut Vec::new())
        .await
        .unwrap();
    std::fs::write(dest.path().join("scratch.txt"), "left over").unwrap();

    let mut diag = Vec::new();
    let second = materializer
        .materialize(&source(), &version(&sha), &InParams::default(), dest.path(), &mut diag)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(head_of(dest.path()), sha);
    assert!(!String::from_utf8_lossy(&diag).contains("> git clone"));
}

#[tokio::test]
async fn pinned_commit_wins_over_moved_head() {
    let upstream = Upstream::new();
    let pinned = run_git(upstream.dir.path(), &["rev-parse", "refs/pull/1/head"]);
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", &pinned, &upstream.url()));

    let moved = upstream.push_to_pull(1, "second change");
    client.push_head(1, &moved);

    let git = CliGit::anonymous();
    let dest = tempfile::tempdir().unwrap();
    let metadata = Materializer::new(&client, &git)
        .materialize(&source(), &version(&pinned), &InParams::default(), dest.path(), &mut Vec::new())
        .await
        .unwrap();

    assert_ne!(pinned, moved);
    assert_eq!(head_of(dest.path()), pinned);
    assert_eq!(metadata.get("head_sha"), Some(pinned.as_str()));
}

#[tokio::test]
async fn shallow_checkout_stays_pinned_across_reruns() {
    let upstream = Upstream::new();
    let pinned = run_git(upstream.dir.path(), &["rev-parse", "refs/pull/1/head"]);
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", &pinned, &upstream.url()));
    let git = CliGit::anonymous();
    let materializer = Materializer::new(&client, &git);
    let dest = tempfile::tempdir().unwrap();
    let params = InParams {
        depth: 1,
        ..InParams::default()
    };

    let mut diag = Vec::new();
    materializer
        .materialize(&source(), &version(&pinned), &params, dest.path(), &mut diag)
        .await
        .unwrap();
    let log = String::from_utf8_lossy(&diag).into_owned();
    assert!(log.contains("> git clone --single-branch --depth 1"), "{log}");
    assert!(log.contains("> git fetch --depth 1 origin"), "{log}");
    assert_eq!(head_of(dest.path()), pinned);
    assert_eq!(
        run_git(dest.path(), &["rev-parse", "--is-shallow-repository"]),
        "true"
    );

    let moved = upstream.push_to_pull(1, "second change");
    client.push_head(1, &moved);

    let mut diag = Vec::new();
    let metadata = materializer
        .materialize(&source(), &version(&pinned), &params, dest.path(), &mut diag)
        .await
        .unwrap();

    assert!(!String::from_utf8_lossy(&diag).contains("> git clone"));
    assert_ne!(pinned, moved);
    assert_eq!(head_of(dest.path()), pinned);
    assert_eq!(branch_of(dest.path()), "feature");
    assert_eq!(metadata.get("head_sha"), Some(pinned.as_str()));
}

#[tokio::test]
async fn failed_pin_writes_no_sidecars() {
    let upstream = Upstream::new();
    let sha = run_git(upstream.dir.path(), &["rev-parse", "refs/pull/1/head"]);
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", &sha, &upstream.url()));
    let git = CliGit::anonymous();
    let dest = tempfile::tempdir().unwrap();

    let err = Materializer::new(&client, &git)
        .materialize(
            &source(),
            &version("1111111111111111111111111111111111111111"),
            &InParams::default(),
            dest.path(),
            &mut Vec::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Git(_)));
    assert!(!SidecarStore::new(dest.path()).dir().exists());
}

/// Git backend that records calls and never touches the filesystem.
#[derive(Default)]
struct RecordingGit {
    calls: Mutex<Vec<String>>,
}

impl RecordingGit {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        Ok(())
    }
}

impl GitBackend for RecordingGit {
    fn is_repository(&self, _dir: &Path) -> bool {
        self.calls.lock().unwrap().push("is_repository".to_string());
        false
    }

    fn clone_repo(&self, _url: &str, _dest: &Path, _depth: u32, _diag: &mut dyn Write) -> Result<()> {
        self.record("clone")
    }

    fn fetch_pull_refs(&self, _dir: &Path, _depth: u32, _diag: &mut dyn Write) -> Result<()> {
        self.record("fetch")
    }

    fn force_checkout(&self, _dir: &Path, _branch: &str, _sha: &str, _diag: &mut dyn Write) -> Result<()> {
        self.record("checkout")
    }
}

#[tokio::test]
async fn skip_download_only_writes_sidecars() {
    let client = MemoryHostingClient::new()
        .with_pull_request(pull_request(1, "feature", "abc", "file:///nowhere"));
    let dest = tempfile::tempdir().unwrap();

    let recording = RecordingGit::default();
    let params = InParams {
        skip_download: true,
        depth: 0,
    };
    let mut diag = Vec::new();
    let skipped = Materializer::new(&client, &recording)
        .materialize(&source(), &version("abc"), &params, dest.path(), &mut diag)
        .await
        .unwrap();
    assert!(recording.calls().is_empty());
    assert!(String::from_utf8_lossy(&diag).contains("skip download"));

    let skipped_files = read_resource_dir(dest.path());

    let other = tempfile::tempdir().unwrap();
    let recording = RecordingGit::default();
    let downloaded = Materializer::new(&client, &recording)
        .materialize(&source(), &version("abc"), &InParams::default(), other.path(), &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(
        recording.calls(),
        vec!["is_repository", "clone", "fetch", "checkout"]
    );

    assert_eq!(skipped, downloaded);
    assert_eq!(skipped_files, read_resource_dir(other.path()));
}

fn read_resource_dir(workdir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let dir = SidecarStore::new(workdir).dir().to_path_buf();
    let mut files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = PathBuf::from(path.file_name().unwrap());
            (name, std::fs::read(&path).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn non_numeric_pr_is_version_error() {
    let client = MemoryHostingClient::new();
    let recording = RecordingGit::default();
    let dest = tempfile::tempdir().unwrap();
    let bad = Version {
        pr: "abc".to_string(),
        ..version("abc")
    };

    let err = Materializer::new(&client, &recording)
        .materialize(&source(), &bad, &InParams::default(), dest.path(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Version(_)));
    assert!(recording.calls().is_empty());
}

#[tokio::test]
async fn unknown_pull_request_is_remote_error() {
    let client = MemoryHostingClient::new();
    let recording = RecordingGit::default();
    let dest = tempfile::tempdir().unwrap();

    let err = Materializer::new(&client, &recording)
        .materialize(&source(), &version("abc"), &InParams::default(), dest.path(), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::RemoteApi(_)));
    assert!(!SidecarStore::new(dest.path()).dir().exists());
}
