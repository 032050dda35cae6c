//! Structured lifecycle events for the check, in and out phases.
//!
//! - `PhaseSpan` RAII guard tagging everything inside a phase with
//!   `phase` and `repository`
//! - one emission function per lifecycle event

use tracing::{info, warn};

/// RAII guard that enters a phase-scoped span.
///
/// ```ignore
/// let _span = PhaseSpan::enter("check", "octo/widgets");
/// ```
pub struct PhaseSpan {
    _span: tracing::span::EnteredSpan,
}

impl PhaseSpan {
    pub fn enter(phase: &str, repository: &str) -> Self {
        let span = tracing::info_span!("prhook.phase", phase = %phase, repository = %repository);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_check_started(cursor: Option<&str>) {
    info!(event = "check.started", cursor = cursor.unwrap_or(""));
}

/// Matches found after filtering, before the resolution policy.
pub fn emit_candidates_collected(cursor: Option<i64>, candidates: usize) {
    info!(
        event = "check.candidates",
        cursor = cursor.unwrap_or(0),
        candidates = candidates,
    );
}

pub fn emit_check_resolved(pr: &str, comment_id: &str) {
    info!(event = "check.resolved", pr = %pr, comment_id = %comment_id);
}

pub fn emit_materialize_started(pr: &str, commit: &str, skip_download: bool) {
    info!(
        event = "in.started",
        pr = %pr,
        commit = %commit,
        skip_download = skip_download,
    );
}

/// `cloned` is false when an existing repository was reused.
pub fn emit_workspace_pinned(branch: &str, commit: &str, cloned: bool) {
    info!(event = "in.pinned", branch = %branch, commit = %commit, cloned = cloned);
}

pub fn emit_sidecars_written(dir: &std::path::Path, files: usize) {
    info!(event = "in.sidecars_written", dir = %dir.display(), files = files);
}

pub fn emit_status_reported(commit: &str, state: &str, context: &str) {
    info!(event = "out.status", commit = %commit, state = %state, context = %context);
}

pub fn emit_comment_posted(pr: u64, chars: usize) {
    info!(event = "out.comment", pr = pr, chars = chars);
}

/// Phase failure (warning level); the caller still exits non-zero.
pub fn emit_phase_failed(phase: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "phase.failed", phase = %phase, kind = %kind, error = %error);
}
