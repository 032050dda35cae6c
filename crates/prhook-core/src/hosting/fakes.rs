//! In-memory [`HostingClient`] (testing only)
//!
//! `MemoryHostingClient` serves pull requests, comments and teams from
//! memory, records every write, and can be told to fail specific lookups.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{CommitStatus, HostingClient};
use crate::domain::{
    Branch, Comment, HookError, PullRequest, RepositoryInfo, Result, Team, User,
};

/// Commit status recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatus {
    pub sha: String,
    pub status: CommitStatus,
}

#[derive(Debug, Default)]
pub struct MemoryHostingClient {
    pulls: Mutex<Vec<PullRequest>>,
    comments: Mutex<HashMap<u64, Vec<Comment>>>,
    teams: Mutex<HashMap<Team, Vec<User>>>,
    failing_teams: Mutex<HashSet<Team>>,
    failing_comment_streams: Mutex<HashSet<u64>>,
    statuses: Mutex<Vec<RecordedStatus>>,
    posted_comments: Mutex<Vec<(u64, String)>>,
}

impl MemoryHostingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pull_request(self, pull: PullRequest) -> Self {
        self.pulls.lock().unwrap().push(pull);
        self
    }

    pub fn with_comment(self, number: u64, comment: Comment) -> Self {
        self.comments
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .push(comment);
        self
    }

    pub fn with_team(self, team: Team, members: &[&str]) -> Self {
        self.teams
            .lock()
            .unwrap()
            .insert(team, members.iter().map(|login| User::new(login)).collect());
        self
    }

    /// Make every lookup of `team` fail.
    pub fn with_failing_team(self, team: Team) -> Self {
        self.failing_teams.lock().unwrap().insert(team);
        self
    }

    /// Make listing comments of pull request `number` fail.
    pub fn with_failing_comments(self, number: u64) -> Self {
        self.failing_comment_streams.lock().unwrap().insert(number);
        self
    }

    /// Replace the head SHA of an existing pull request, as a new push would.
    pub fn push_head(&self, number: u64, sha: &str) {
        let mut pulls = self.pulls.lock().unwrap();
        if let Some(pull) = pulls.iter_mut().find(|p| p.number == number) {
            pull.head.sha = sha.to_string();
        }
    }

    pub fn statuses(&self) -> Vec<RecordedStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn posted_comments(&self) -> Vec<(u64, String)> {
        self.posted_comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostingClient for MemoryHostingClient {
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        Ok(self.pulls.lock().unwrap().clone())
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>> {
        if self.failing_comment_streams.lock().unwrap().contains(&number) {
            return Err(HookError::RemoteApi(format!(
                "list issue comments failed for #{number}"
            )));
        }
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_team_members(&self, team: &Team) -> Result<Vec<User>> {
        if self.failing_teams.lock().unwrap().contains(team) {
            return Err(HookError::RemoteApi(format!("team {team}: lookup failed")));
        }
        self.teams
            .lock()
            .unwrap()
            .get(team)
            .cloned()
            .ok_or_else(|| HookError::RemoteApi(format!("team {team}: not found")))
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        self.pulls
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or_else(|| HookError::RemoteApi(format!("pull request #{number} not found")))
    }

    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        self.statuses.lock().unwrap().push(RecordedStatus {
            sha: sha.to_string(),
            status: status.clone(),
        });
        Ok(())
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<()> {
        self.posted_comments
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }
}

/// Pull request fixture whose head and base live in `clone_url`.
pub fn pull_request(number: u64, head_ref: &str, head_sha: &str, clone_url: &str) -> PullRequest {
    let repo = Some(RepositoryInfo {
        clone_url: clone_url.to_string(),
    });
    PullRequest {
        number,
        html_url: format!("https://github.com/octo/widgets/pull/{number}"),
        head: Branch {
            ref_name: head_ref.to_string(),
            sha: head_sha.to_string(),
            repo: repo.clone(),
        },
        base: Branch {
            ref_name: "main".to_string(),
            sha: "0000000000000000000000000000000000000000".to_string(),
            repo,
        },
    }
}

/// Comment fixture; `created_at` is derived from `id` so it is deterministic.
pub fn comment(id: i64, login: &str, body: &str) -> Comment {
    Comment {
        id,
        user: User::new(login),
        body: body.to_string(),
        created_at: Utc
            .timestamp_opt(1_700_000_000 + id, 0)
            .single()
            .unwrap_or_default(),
    }
}
