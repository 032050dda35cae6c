//! Out phase: status and reply comment driven by the in-phase sidecars.

use std::path::Path;

use prhook_core::domain::MetadataField;
use prhook_core::hosting::fakes::MemoryHostingClient;
use prhook_core::{
    report, BuildEnv, HookError, Metadata, OutParams, SidecarStore, Source, StatusState, Version,
};

fn source() -> Source {
    Source {
        access_token: "token".to_string(),
        repository: "octo/widgets".to_string(),
        trigger_phrase: "/deploy".to_string(),
        allow_all_users: true,
        ..Source::default()
    }
}

fn version() -> Version {
    Version {
        pr: "7".to_string(),
        commit: "cafebabe".to_string(),
        comment_id: "99".to_string(),
        comment: "/deploy".to_string(),
        commented_at: None,
    }
}

/// Sources root with the in-phase output under `repo/`.
fn materialized() -> tempfile::TempDir {
    let sources = tempfile::tempdir().unwrap();
    let metadata = Metadata(vec![
        MetadataField::new("pr", "7"),
        MetadataField::new("head_sha", "cafebabe"),
    ]);
    SidecarStore::new(sources.path().join("repo"))
        .write(&version(), &metadata)
        .unwrap();
    sources
}

fn params(status: &str) -> OutParams {
    OutParams {
        path: "repo".to_string(),
        status: status.to_string(),
        ..OutParams::default()
    }
}

fn env() -> BuildEnv {
    BuildEnv {
        external_url: Some("https://ci.example.com".to_string()),
        build_id: Some("314".to_string()),
    }
}

#[tokio::test]
async fn posts_status_on_pinned_commit() {
    let sources = materialized();
    let client = MemoryHostingClient::new();

    let response = report(&client, &source(), &params("success"), sources.path(), &env())
        .await
        .unwrap();

    assert_eq!(response.version, version());
    assert_eq!(response.metadata.get("head_sha"), Some("cafebabe"));

    let statuses = client.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].sha, "cafebabe");
    assert_eq!(statuses[0].status.state, StatusState::Success);
    assert_eq!(statuses[0].status.context, "concourse-ci/status");
    assert_eq!(statuses[0].status.target_url, "https://ci.example.com/builds/314");
    assert_eq!(statuses[0].status.description, "Concourse CI build success");
    assert!(client.posted_comments().is_empty());
}

#[tokio::test]
async fn comment_file_is_posted_to_pull_request() {
    let sources = materialized();
    std::fs::write(sources.path().join("reply.md"), "Deployed :rocket:").unwrap();
    let client = MemoryHostingClient::new();
    let params = OutParams {
        comment: "ignored inline".to_string(),
        comment_file: "reply.md".to_string(),
        context: "deploy".to_string(),
        ..params("pending")
    };

    report(&client, &source(), &params, sources.path(), &BuildEnv::default())
        .await
        .unwrap();

    assert_eq!(client.posted_comments(), vec![(7, "Deployed :rocket:".to_string())]);
    let statuses = client.statuses();
    assert_eq!(statuses[0].status.context, "concourse-ci/deploy");
    assert_eq!(statuses[0].status.target_url, "");
}

#[tokio::test]
async fn missing_sidecars_are_filesystem_error() {
    let sources = tempfile::tempdir().unwrap();
    let client = MemoryHostingClient::new();

    let err = report(&client, &source(), &params("failure"), sources.path(), &env())
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Filesystem(_)));
    assert!(client.statuses().is_empty());
}

#[tokio::test]
async fn unknown_status_is_config_error() {
    let sources = materialized();
    let client = MemoryHostingClient::new();

    let err = report(&client, &source(), &params("exploded"), sources.path(), &env())
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Config(_)));
    assert!(client.statuses().is_empty());
}

#[tokio::test]
async fn missing_description_file_posts_nothing() {
    let sources = materialized();
    let client = MemoryHostingClient::new();
    let params = OutParams {
        description_file: Path::new("notes").join("absent.txt").display().to_string(),
        ..params("error")
    };

    let err = report(&client, &source(), &params, sources.path(), &env())
        .await
        .unwrap_err();

    assert!(matches!(err, HookError::Filesystem(_)));
    assert!(client.statuses().is_empty());
}
