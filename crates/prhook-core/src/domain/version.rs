//! Resolved trigger version, the unit of pipeline progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{HookError, Result};
use super::pull_request::{Comment, PullRequest};

/// A trigger comment pinned to the head commit it was resolved against.
///
/// Versions are totally ordered by the numeric value of `comment_id`; the
/// string form is what travels over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    #[serde(default)]
    pub pr: String,

    /// Head commit SHA at resolution time.
    #[serde(default)]
    pub commit: String,

    #[serde(default)]
    pub comment_id: String,

    #[serde(default)]
    pub comment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commented_at: Option<DateTime<Utc>>,
}

impl Version {
    /// Build the candidate version for `comment` on `pull`.
    pub fn from_comment(pull: &PullRequest, comment: &Comment) -> Self {
        Self {
            pr: pull.number.to_string(),
            commit: pull.head.sha.clone(),
            comment_id: comment.id.to_string(),
            comment: comment.body.clone(),
            commented_at: Some(comment.created_at),
        }
    }

    /// Whether this version carries a cursor at all.
    pub fn has_cursor(&self) -> bool {
        !self.comment_id.is_empty()
    }

    /// Numeric comment id.
    pub fn comment_id(&self) -> Result<i64> {
        self.comment_id.parse::<i64>().map_err(|e| {
            HookError::Cursor(format!(
                "failed to parse comment_id '{}': {e}",
                self.comment_id
            ))
        })
    }

    /// Numeric pull-request number.
    pub fn pr_number(&self) -> Result<u64> {
        self.pr
            .parse::<u64>()
            .map_err(|e| HookError::Version(format!("failed to parse pr number '{}': {e}", self.pr)))
    }
}
