//! Error taxonomy shared by the check, in and out phases.

/// Errors produced by prhook operations.
///
/// Every variant is fatal to the phase that raised it; nothing in the crate
/// downgrades an error into a default value.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Invalid or missing source/params field. Never retried.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The prior version's comment id is not a 64-bit integer.
    #[error("invalid cursor: {0}")]
    Cursor(String),

    /// The version handed to a phase is unusable (e.g. non-numeric pr).
    #[error("invalid version: {0}")]
    Version(String),

    /// Any hosting-service call failure, including pagination and team lookups.
    #[error("remote api error: {0}")]
    RemoteApi(String),

    #[error("git operation failed: {0}")]
    Git(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HookError {
    /// Stable snake-case tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HookError::Config(_) => "config_error",
            HookError::Cursor(_) => "cursor_error",
            HookError::Version(_) => "version_error",
            HookError::RemoteApi(_) => "remote_api_error",
            HookError::Git(_) => "git_operation_error",
            HookError::Filesystem(_) => "filesystem_error",
            HookError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<std::io::Error> for HookError {
    fn from(err: std::io::Error) -> Self {
        HookError::Filesystem(err.to_string())
    }
}

impl From<reqwest::Error> for HookError {
    fn from(err: reqwest::Error) -> Self {
        HookError::RemoteApi(err.to_string())
    }
}

/// Result type for prhook operations.
pub type Result<T> = std::result::Result<T, HookError>;
