//! Resource source configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{HookError, Result};

/// Default REST endpoint used when `api_url` is not configured.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// A team reference, `organization` + team `slug`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Team {
    pub organization: String,
    pub slug: String,
}

impl Team {
    pub fn new(organization: &str, slug: &str) -> Self {
        Self {
            organization: organization.to_string(),
            slug: slug.to_string(),
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.organization, self.slug)
    }
}

/// Repository coordinates split out of `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `owner/repo`. Exactly two non-empty segments are required.
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        match segments.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(HookError::Config(format!(
                "repository must have the form owner/repo, got '{raw}'"
            ))),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Immutable per-invocation configuration supplied by the orchestrator.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub repository: String,

    /// Regular expression a comment body must match to trigger.
    #[serde(default)]
    pub trigger_phrase: String,

    #[serde(default)]
    pub allow_users: Vec<String>,

    #[serde(default)]
    pub allow_teams: Vec<Team>,

    #[serde(default)]
    pub ignore_users: Vec<String>,

    #[serde(default)]
    pub ignore_teams: Vec<Team>,

    /// Bypass the allow-list. The ignore-list still applies.
    #[serde(default)]
    pub allow_all_users: bool,

    /// REST API base, for GitHub Enterprise installations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

// The token must never reach the logs.
impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("access_token", &"<redacted>")
            .field("repository", &self.repository)
            .field("trigger_phrase", &self.trigger_phrase)
            .field("allow_users", &self.allow_users)
            .field("allow_teams", &self.allow_teams)
            .field("ignore_users", &self.ignore_users)
            .field("ignore_teams", &self.ignore_teams)
            .field("allow_all_users", &self.allow_all_users)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Source {
    /// Check every field the phases depend on.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(HookError::Config("access_token must be set".to_string()));
        }
        if self.repository.is_empty() {
            return Err(HookError::Config("repository must be set".to_string()));
        }
        RepoRef::parse(&self.repository)?;
        self.trigger_regex()?;

        if !self.allow_all_users && self.allow_users.is_empty() && self.allow_teams.is_empty() {
            return Err(HookError::Config(
                "allow_all_users, allow_users or allow_teams must be set".to_string(),
            ));
        }

        for (field, teams) in [
            ("allow_teams", &self.allow_teams),
            ("ignore_teams", &self.ignore_teams),
        ] {
            if let Some(team) = teams
                .iter()
                .find(|t| t.organization.is_empty() || t.slug.is_empty())
            {
                return Err(HookError::Config(format!(
                    "{field} entry '{team}' needs both organization and slug"
                )));
            }
        }

        Ok(())
    }

    pub fn repo_ref(&self) -> Result<RepoRef> {
        RepoRef::parse(&self.repository)
    }

    /// Compile `trigger_phrase`.
    pub fn trigger_regex(&self) -> Result<Regex> {
        if self.trigger_phrase.is_empty() {
            return Err(HookError::Config("trigger_phrase must be set".to_string()));
        }
        Regex::new(&self.trigger_phrase)
            .map_err(|e| HookError::Config(format!("trigger_phrase is not a valid regex: {e}")))
    }

    pub fn api_base(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
    }
}
