//! Check phase: resolve the next trigger version.
//!
//! Scans every open pull request's comment stream for comments newer than
//! the cursor whose author passes the allow/ignore filters and whose body
//! matches the trigger phrase, then applies the resolution policy:
//!
//! 1. nothing new and a cursor was given: return the cursor unchanged;
//! 2. no cursor (first run or manual trigger): return the newest match;
//! 3. otherwise: return the oldest unseen match.
//!
//! The answer never holds more than one version. Any remote failure aborts
//! the whole resolution; a partial allow-set is never used.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Comment, HookError, Result, Source, Team, UserSet, Version};
use crate::hosting::HostingClient;
use crate::obs;

/// Request document read by the check phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub source: Source,
    /// `null`, absent, or a version with an empty `comment_id` all mean
    /// "no cursor".
    #[serde(default)]
    pub version: Option<Version>,
}

/// Comment filter derived from a source and the expanded user sets.
pub struct TriggerFilter {
    trigger: Regex,
    allow_all_users: bool,
    allow: UserSet,
    ignore: UserSet,
    cursor: Option<i64>,
}

impl TriggerFilter {
    pub fn new(
        trigger: Regex,
        allow_all_users: bool,
        allow: UserSet,
        ignore: UserSet,
        cursor: Option<i64>,
    ) -> Self {
        Self {
            trigger,
            allow_all_users,
            allow,
            ignore,
            cursor,
        }
    }

    /// Whether `comment` is an unseen trigger comment.
    pub fn accepts(&self, comment: &Comment) -> bool {
        if self.cursor.is_some_and(|cursor| comment.id <= cursor) {
            return false;
        }
        if !self.allow_all_users && !self.allow.contains(comment.author()) {
            return false;
        }
        if self.ignore.contains(comment.author()) {
            return false;
        }
        self.trigger.is_match(&comment.body)
    }
}

/// Resolve the versions to report for this check.
pub async fn resolve(
    client: &dyn HostingClient,
    source: &Source,
    previous: Option<&Version>,
) -> Result<Vec<Version>> {
    source.validate()?;
    let trigger = source.trigger_regex()?;

    let previous = previous.filter(|v| v.has_cursor());
    let cursor = previous.map(Version::comment_id).transpose()?;

    let allow = expand_users(client, &source.allow_users, &source.allow_teams).await?;
    let ignore = expand_users(client, &source.ignore_users, &source.ignore_teams).await?;
    debug!(
        allow = allow.len(),
        ignore = ignore.len(),
        allow_all_users = source.allow_all_users,
        "user sets expanded"
    );

    let filter = TriggerFilter::new(trigger, source.allow_all_users, allow, ignore, cursor);
    let candidates = collect_candidates(client, &filter).await?;
    obs::emit_candidates_collected(cursor, candidates.len());

    select(candidates, previous)
}

/// Union of `users` and the members of every team in `teams`.
pub async fn expand_users(
    client: &dyn HostingClient,
    users: &[String],
    teams: &[Team],
) -> Result<UserSet> {
    let mut set: UserSet = users.iter().collect();
    for team in teams {
        let members: UserSet = client
            .list_team_members(team)
            .await?
            .iter()
            .map(|user| user.login.as_str())
            .collect();
        debug!(team = %team, members = members.len(), "team expanded");
        set.union_with(&members);
    }
    Ok(set)
}

/// Every accepted comment across all open pull requests, sorted ascending
/// by numeric comment id.
pub async fn collect_candidates(
    client: &dyn HostingClient,
    filter: &TriggerFilter,
) -> Result<Vec<(i64, Version)>> {
    let pulls = client.list_pull_requests().await?;
    let mut candidates = Vec::new();

    for pull in &pulls {
        let comments = client.list_issue_comments(pull.number).await?;
        candidates.extend(
            comments
                .iter()
                .filter(|comment| filter.accepts(comment))
                .map(|comment| (comment.id, Version::from_comment(pull, comment))),
        );
    }

    candidates.sort_by_key(|(id, _)| *id);
    Ok(candidates)
}

/// Apply the resolution policy to sorted candidates.
pub fn select(
    candidates: Vec<(i64, Version)>,
    previous: Option<&Version>,
) -> Result<Vec<Version>> {
    let picked = match previous {
        None => candidates.into_iter().next_back(),
        Some(previous) => match candidates.into_iter().next() {
            Some(oldest) => Some(oldest),
            None => return Ok(vec![previous.clone()]),
        },
    };

    Ok(picked.map(|(_, version)| version).into_iter().collect())
}

/// Decode a check request document.
pub fn parse_request(raw: &str) -> Result<CheckRequest> {
    serde_json::from_str(raw).map_err(|e| HookError::Config(format!("invalid check request: {e}")))
}
