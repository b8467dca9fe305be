//! Structured observability hooks for pipeline lifecycle events.
//!
//! Provides a `PipelineSpan` RAII guard scoping all events of one invocation,
//! plus emission functions for attempt, review and completion events.
//! Verbosity follows `RUST_LOG`; JSON output is selected in [`crate::telemetry`].

use tracing::{info, warn};

/// RAII guard that enters an invocation-scoped span.
///
/// ```ignore
/// let _span = PipelineSpan::enter("0b6d...");
/// // every event below carries invocation_id = "0b6d..."
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    pub fn enter(invocation_id: &str) -> Self {
        Self {
            _span: pipeline_span(invocation_id).entered(),
        }
    }
}

/// The invocation span itself, for instrumenting futures.
pub fn pipeline_span(invocation_id: &str) -> tracing::Span {
    tracing::info_span!("draftsmith.pipeline", invocation_id = %invocation_id)
}

/// Emit event: a backend attempt is starting.
pub fn emit_attempt_started(backend: &str, attempt: usize) {
    info!(event = "model.attempt_started", backend = %backend, attempt = attempt);
}

/// Emit event: a backend attempt failed and the chain advances (warning level).
pub fn emit_attempt_failed(backend: &str, attempt: usize, error: &dyn std::fmt::Display) {
    warn!(
        event = "model.attempt_failed",
        backend = %backend,
        attempt = attempt,
        error = %error,
    );
}

/// Emit event: a backend produced a valid proposal.
pub fn emit_backend_selected(backend: &str, attempt: usize) {
    info!(event = "model.backend_selected", backend = %backend, attempt = attempt);
}

pub fn emit_review_completed(passed: bool, warnings: usize, blockers: usize) {
    info!(
        event = "review.completed",
        passed = passed,
        warnings = warnings,
        blockers = blockers,
    );
}

/// Emit event: invocation reached a terminal state.
pub fn emit_pipeline_finished(success: bool, backend: Option<&str>, duration_ms: u64) {
    info!(
        event = "pipeline.finished",
        success = success,
        backend = backend.unwrap_or(""),
        duration_ms = duration_ms,
    );
}
