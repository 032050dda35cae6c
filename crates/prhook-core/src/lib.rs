//! prhook Core Library
//!
//! Pull-request comment trigger resource for a CI orchestrator:
//! - `resolver`: check phase, resolves the next trigger comment
//! - `materialize`: in phase, pins a working copy to the resolved commit
//! - `reporter`: out phase, reports commit status and replies

pub mod domain;
pub mod hosting;
pub mod materialize;
pub mod obs;
pub mod reporter;
pub mod resolver;
pub mod telemetry;

pub use domain::{
    Branch, Comment, HookError, Metadata, MetadataField, PullRequest, RepoRef, RepositoryInfo,
    Result, Source, Team, User, UserSet, Version, DEFAULT_API_URL,
};

pub use hosting::{CommitStatus, GithubClient, HostingClient, StatusState};

pub use materialize::{
    CliGit, GitBackend, InParams, InRequest, Materializer, PhaseResponse, SidecarStore,
};
pub use reporter::{report, BuildEnv, OutParams, OutRequest};
pub use resolver::{resolve, CheckRequest, TriggerFilter};

pub use obs::PhaseSpan;
pub use telemetry::init_tracing;

/// prhook version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
