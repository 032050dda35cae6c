//! Hosting-service port.
//!
//! `HostingClient` is the only way the phases talk to the code-hosting
//! service. `GithubClient` implements it over the REST API; the `fakes`
//! module provides an in-memory implementation for tests.
//!
//! Every call is awaited to completion; list calls drain all pages before
//! returning. Any failure is surfaced as `HookError::RemoteApi`.

pub mod fakes;
pub mod github;
pub mod pagination;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, HookError, PullRequest, Result, Team, User};

pub use github::GithubClient;

/// Commit status states accepted by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Error,
    Failure,
    Pending,
    Success,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Error => "error",
            StatusState::Failure => "failure",
            StatusState::Pending => "pending",
            StatusState::Success => "success",
        }
    }
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusState {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(StatusState::Error),
            "failure" => Ok(StatusState::Failure),
            "pending" => Ok(StatusState::Pending),
            "success" => Ok(StatusState::Success),
            other => Err(HookError::Config(format!(
                "invalid status '{other}', expected one of error, failure, pending, success"
            ))),
        }
    }
}

/// Body of a commit status update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStatus {
    pub state: StatusState,
    /// Omitted from the request when empty; the API rejects blank URLs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_url: String,
    pub description: String,
    pub context: String,
}

/// Access to pull requests, comments, teams and status reporting on one
/// repository.
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// All open pull requests.
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>>;

    /// The full issue-comment stream of pull request `number`.
    async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>>;

    /// Members of `team`.
    async fn list_team_members(&self, team: &Team) -> Result<Vec<User>>;

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest>;

    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()>;

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<()>;
}
