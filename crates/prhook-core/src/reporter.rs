//! Out phase: report build status back to the pull request.
//!
//! Reads the sidecar files left by the in phase, sets a commit status on
//! the pinned commit and optionally replies with a comment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{HookError, Result, Source};
use crate::hosting::{CommitStatus, HostingClient, StatusState};
use crate::materialize::{PhaseResponse, SidecarStore};
use crate::obs;

pub const DEFAULT_BASE_CONTEXT: &str = "concourse-ci";
pub const DEFAULT_CONTEXT: &str = "status";

/// `params` of an out request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutParams {
    /// Directory, relative to the sources root, holding the materialized repo.
    pub path: String,
    pub status: String,
    pub base_context: String,
    pub context: String,
    pub target_url: String,
    pub description: String,
    /// Read the description from this file (relative to the sources root).
    pub description_file: String,
    pub comment: String,
    pub comment_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutRequest {
    pub source: Source,
    #[serde(default)]
    pub params: OutParams,
}

/// Build environment supplied by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub external_url: Option<String>,
    pub build_id: Option<String>,
}

impl BuildEnv {
    /// `<external_url>/builds/<build_id>`, when both are known.
    pub fn build_url(&self) -> Option<String> {
        match (self.external_url.as_deref(), self.build_id.as_deref()) {
            (Some(url), Some(id)) if !url.is_empty() && !id.is_empty() => {
                Some(format!("{}/builds/{}", url.trim_end_matches('/'), id))
            }
            _ => None,
        }
    }
}

impl OutParams {
    pub fn state(&self) -> Result<StatusState> {
        if self.status.is_empty() {
            return Err(HookError::Config("params.status must be set".to_string()));
        }
        self.status.parse()
    }

    /// `<base_context>/<context>` with defaults applied.
    pub fn full_context(&self) -> String {
        let base = non_empty(&self.base_context).unwrap_or(DEFAULT_BASE_CONTEXT);
        let context = non_empty(&self.context).unwrap_or(DEFAULT_CONTEXT);
        format!("{base}/{context}")
    }

    pub fn description(&self, sources: &Path, state: StatusState) -> Result<String> {
        if let Some(text) = read_param_file(sources, &self.description_file)? {
            return Ok(text);
        }
        Ok(non_empty(&self.description)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Concourse CI build {state}")))
    }

    /// Reply comment; empty means no comment is posted.
    pub fn comment(&self, sources: &Path) -> Result<String> {
        if let Some(text) = read_param_file(sources, &self.comment_file)? {
            return Ok(text);
        }
        Ok(self.comment.clone())
    }

    pub fn commit_status(
        &self,
        sources: &Path,
        state: StatusState,
        env: &BuildEnv,
    ) -> Result<CommitStatus> {
        let target_url = non_empty(&self.target_url)
            .map(str::to_string)
            .or_else(|| env.build_url())
            .unwrap_or_default();
        Ok(CommitStatus {
            state,
            target_url,
            description: self.description(sources, state)?,
            context: self.full_context(),
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn read_param_file(sources: &Path, relative: &str) -> Result<Option<String>> {
    if relative.is_empty() {
        return Ok(None);
    }
    let path = sources.join(relative);
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|e| HookError::Filesystem(format!("failed to read {}: {e}", path.display())))
}

/// Report status for the version materialized under `sources/<params.path>`.
pub async fn report(
    client: &dyn HostingClient,
    source: &Source,
    params: &OutParams,
    sources: &Path,
    env: &BuildEnv,
) -> Result<PhaseResponse> {
    source.validate()?;
    let state = params.state()?;

    let store = SidecarStore::new(sources.join(&params.path));
    let version = store.read_version()?;
    let metadata = store.read_metadata()?;
    let number = version.pr_number()?;

    let status = params.commit_status(sources, state, env)?;
    let comment = params.comment(sources)?;

    client.create_commit_status(&version.commit, &status).await?;
    obs::emit_status_reported(&version.commit, state.as_str(), &status.context);

    if !comment.is_empty() {
        client.create_issue_comment(number, &comment).await?;
        obs::emit_comment_posted(number, comment.chars().count());
    }

    Ok(PhaseResponse { version, metadata })
}
