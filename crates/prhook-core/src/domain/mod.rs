//! Domain model for prhook.
//!
//! - `Source`: per-invocation configuration
//! - `Version`: resolved trigger comment pinned to a head commit
//! - `PullRequest` / `Comment` / `User`: read-only hosting records
//! - `Metadata`: ordered name/value description of a version
//! - `UserSet`: allow/ignore login sets

pub mod error;
pub mod metadata;
pub mod pull_request;
pub mod source;
pub mod user_set;
pub mod version;

pub use error::{HookError, Result};
pub use metadata::{Metadata, MetadataField};
pub use pull_request::{Branch, Comment, PullRequest, RepositoryInfo, User};
pub use source::{RepoRef, Source, Team, DEFAULT_API_URL};
pub use user_set::UserSet;
pub use version::Version;
