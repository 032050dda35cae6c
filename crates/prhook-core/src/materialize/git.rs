//! Git backend used by the materializer.
//!
//! `CliGit` drives the `git` executable. Progress and command output are
//! copied to the caller's diagnostic writer; nothing is written to the
//! process stdout.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use crate::domain::{HookError, Result};

/// Refspec mapping every pull-request ref onto a remote-tracking namespace.
pub const PULL_REFSPEC: &str = "+refs/pull/*:refs/remotes/origin/pr/*";

/// Environment variable the credential helper reads the token from.
const TOKEN_ENV: &str = "PRHOOK_GIT_TOKEN";

/// Operations the materializer needs from a git implementation.
pub trait GitBackend: Send + Sync {
    /// Whether `dir` itself is the top level of a git work tree.
    fn is_repository(&self, dir: &Path) -> bool;

    /// Shallow (when `depth > 0`), single-branch clone of `url` into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path, depth: u32, diag: &mut dyn Write) -> Result<()>;

    /// Fetch `refs/pull/*` from `origin` into `refs/remotes/origin/pr/*`.
    /// Nothing to fetch is success.
    fn fetch_pull_refs(&self, dir: &Path, depth: u32, diag: &mut dyn Write) -> Result<()>;

    /// Point local branch `branch` at `sha` unconditionally and check it
    /// out, discarding working-tree differences.
    fn force_checkout(&self, dir: &Path, branch: &str, sha: &str, diag: &mut dyn Write)
        -> Result<()>;
}

/// `git` command-line backend.
pub struct CliGit {
    token: Option<String>,
}

impl CliGit {
    /// Backend authenticating HTTPS remotes with `token`.
    pub fn new(token: &str) -> Self {
        let token = token.trim();
        Self {
            token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    /// Backend without credentials (local and public remotes).
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    fn command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(token) = &self.token {
            // Token travels through the environment, never argv or .git/config.
            let helper = format!(
                "credential.helper=!f() {{ echo username=x-oauth-basic; echo \"password=${TOKEN_ENV}\"; }}; f"
            );
            cmd.env(TOKEN_ENV, token)
                .args(["-c", "credential.helper=", "-c", helper.as_str()]);
        }
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn run(&self, dir: Option<&Path>, args: &[&str], diag: &mut dyn Write) -> Result<Output> {
        writeln!(diag, "> git {}", args.join(" "))?;
        let output = self
            .command(dir)
            .args(args)
            .output()
            .map_err(|e| HookError::Git(format!("failed to run git: {e}")))?;
        diag.write_all(&output.stdout)?;
        diag.write_all(&output.stderr)?;
        Ok(output)
    }

    /// Run git and fail with `<context>: <stderr>` on a non-zero exit.
    fn run_checked(
        &self,
        dir: Option<&Path>,
        args: &[&str],
        context: &str,
        diag: &mut dyn Write,
    ) -> Result<()> {
        let output = self.run(dir, args, diag)?;
        if output.status.success() {
            return Ok(());
        }
        Err(HookError::Git(format!(
            "{context}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

fn depth_args(depth: u32) -> Vec<String> {
    if depth > 0 {
        vec!["--depth".to_string(), depth.to_string()]
    } else {
        Vec::new()
    }
}

/// Whether git reported that there was nothing to fetch.
fn is_up_to_date(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("already up to date") || stderr.contains("already up-to-date")
}

impl GitBackend for CliGit {
    fn is_repository(&self, dir: &Path) -> bool {
        let Ok(wanted) = dir.canonicalize() else {
            return false;
        };
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .output();
        match output {
            Ok(o) if o.status.success() => {
                let toplevel = String::from_utf8_lossy(&o.stdout).trim().to_string();
                Path::new(&toplevel)
                    .canonicalize()
                    .map(|found| found == wanted)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }

    fn clone_repo(&self, url: &str, dest: &Path, depth: u32, diag: &mut dyn Write) -> Result<()> {
        let dest = dest.to_string_lossy().into_owned();
        let depth = depth_args(depth);
        let mut args = vec!["clone", "--single-branch"];
        args.extend(depth.iter().map(String::as_str));
        args.extend(["--", url, dest.as_str()]);
        self.run_checked(None, &args, "failed to clone repository", diag)
    }

    fn fetch_pull_refs(&self, dir: &Path, depth: u32, diag: &mut dyn Write) -> Result<()> {
        let depth = depth_args(depth);
        let mut args = vec!["fetch"];
        args.extend(depth.iter().map(String::as_str));
        args.extend(["origin", PULL_REFSPEC]);

        let output = self.run(Some(dir), &args, diag)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() || is_up_to_date(&stderr) {
            return Ok(());
        }
        Err(HookError::Git(format!("failed to fetch: {}", stderr.trim())))
    }

    fn force_checkout(
        &self,
        dir: &Path,
        branch: &str,
        sha: &str,
        diag: &mut dyn Write,
    ) -> Result<()> {
        self.run_checked(
            Some(dir),
            &["checkout", "--force", "-B", branch, sha],
            &format!("failed to check out {branch} at {sha}"),
            diag,
        )
    }
}
