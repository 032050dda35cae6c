//! Read-only hosting-service records, shaped like the REST payloads they
//! are decoded from. Only the consumed fields are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub login: String,
}

impl User {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
        }
    }
}

/// Repository a pull-request branch lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub clone_url: String,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    /// `null` when the source repository has been deleted.
    #[serde(default)]
    pub repo: Option<RepositoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    pub head: Branch,
    pub base: Branch,
}

impl PullRequest {
    /// Clone endpoint of the head repository, if it still exists.
    pub fn head_clone_url(&self) -> Option<&str> {
        self.head.repo.as_ref().map(|r| r.clone_url.as_str())
    }
}

/// An issue comment on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub user: User,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn author(&self) -> &str {
        &self.user.login
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
