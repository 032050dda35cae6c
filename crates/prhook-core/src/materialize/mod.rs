//! In phase: materialize a resolved version into a working directory.
//!
//! State machine over the destination directory:
//!
//! ```text
//! Unknown --(not a repo)--> Clone --+
//!    |                              +--> Fetch refs/pull/* --> Pin (forced) --> sidecars
//!    +-----(repo present)--> Reuse -+
//! ```
//!
//! With `skip_download` the git states are bypassed and only the sidecar
//! files are written. Sidecars are written last, so a failed git step never
//! leaves fresh metadata behind. Re-running with the same version is safe:
//! the pin is a forced checkout, not an incremental update.

pub mod git;
pub mod sidecar;

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{HookError, Metadata, PullRequest, Result, Source, Version};
use crate::hosting::HostingClient;
use crate::obs;

pub use git::{CliGit, GitBackend, PULL_REFSPEC};
pub use sidecar::SidecarStore;

/// `params` of an in request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InParams {
    #[serde(default)]
    pub skip_download: bool,

    /// Shallow clone/fetch depth; `0` fetches full history.
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
    #[serde(default)]
    pub params: InParams,
}

/// Response of the in and out phases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseResponse {
    pub version: Version,
    pub metadata: Metadata,
}

/// Brings a destination directory to a pinned version.
pub struct Materializer<'a> {
    client: &'a dyn HostingClient,
    git: &'a dyn GitBackend,
}

impl<'a> Materializer<'a> {
    pub fn new(client: &'a dyn HostingClient, git: &'a dyn GitBackend) -> Self {
        Self { client, git }
    }

    /// Materialize `version` into `dest` and persist its sidecar files.
    ///
    /// Git progress is written to `diag`.
    pub async fn materialize(
        &self,
        source: &Source,
        version: &Version,
        params: &InParams,
        dest: &Path,
        diag: &mut dyn Write,
    ) -> Result<Metadata> {
        source.validate()?;
        let number = version.pr_number()?;
        obs::emit_materialize_started(&version.pr, &version.commit, params.skip_download);

        let pull = self.client.get_pull_request(number).await?;

        if params.skip_download {
            writeln!(diag, "skip download")?;
        } else {
            self.download(&pull, version, params.depth, dest, diag)?;
        }

        let metadata = Metadata::describe(&pull, version);
        let store = SidecarStore::new(dest);
        let files = store.write(version, &metadata)?;
        obs::emit_sidecars_written(store.dir(), files);

        Ok(metadata)
    }

    fn download(
        &self,
        pull: &PullRequest,
        version: &Version,
        depth: u32,
        dest: &Path,
        diag: &mut dyn Write,
    ) -> Result<()> {
        if version.commit.is_empty() {
            return Err(HookError::Version(format!(
                "version for pr {} has no commit",
                version.pr
            )));
        }

        let cloned = if self.git.is_repository(dest) {
            debug!(dest = %dest.display(), "reusing existing repository");
            false
        } else {
            let url = pull.head_clone_url().ok_or_else(|| {
                HookError::Git(format!(
                    "head repository of pr {} no longer exists",
                    pull.number
                ))
            })?;
            self.git.clone_repo(url, dest, depth, diag)?;
            true
        };

        self.git.fetch_pull_refs(dest, depth, diag)?;
        self.git
            .force_checkout(dest, &pull.head.ref_name, &version.commit, diag)?;
        obs::emit_workspace_pinned(&pull.head.ref_name, &version.commit, cloned);
        Ok(())
    }
}
