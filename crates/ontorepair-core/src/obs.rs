//! Structured observability hooks for the validation loop.
//!
//! This module provides:
//! - A run-scoped tracing span for the loop future
//! - Emission functions for loop lifecycle events
//!
//! Events are emitted at `info!` level, failures at `warn!`.

use tracing::{info, warn};

/// Span tagging every event of one loop run with its run_id.
///
/// Attach it to the loop future with `tracing::Instrument`:
///
/// ```ignore
/// orchestrator.drive(state).instrument(loop_span(&run_id)).await
/// ```
pub fn loop_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("ontorepair.loop", run_id = %run_id)
}

/// Emit event: loop started.
pub fn emit_loop_started(run_id: &str, max_iterations: u32, reasoners: &[String]) {
    info!(
        event = "loop.started",
        run_id = %run_id,
        max_iterations = max_iterations,
        reasoners = %reasoners.join(","),
    );
}

/// Emit event: one checking pass completed.
pub fn emit_check_completed(
    run_id: &str,
    generation: u32,
    fatal: usize,
    warnings: usize,
    trusted: bool,
) {
    info!(
        event = "loop.check_completed",
        run_id = %run_id,
        generation = generation,
        fatal = fatal,
        warnings = warnings,
        trusted = trusted,
    );
}

/// Emit event: repair prompt sent to the backend.
pub fn emit_repair_requested(run_id: &str, generation: u32, sections: usize) {
    info!(
        event = "loop.repair_requested",
        run_id = %run_id,
        generation = generation,
        sections = sections,
    );
}

/// Emit event: a repaired candidate was rejected (warning level).
pub fn emit_repair_rejected(run_id: &str, generation: u32, reason: &str) {
    warn!(
        event = "loop.repair_rejected",
        run_id = %run_id,
        generation = generation,
        reason = %reason,
    );
}

/// Emit event: loop reached a terminal state.
pub fn emit_loop_finished(run_id: &str, outcome: &str, iterations: u32, duration_ms: u64) {
    info!(
        event = "loop.finished",
        run_id = %run_id,
        outcome = %outcome,
        iterations = iterations,
        duration_ms = duration_ms,
    );
}

/// Emit event: a reasoner failed and its verdict is excluded (warning level).
pub fn emit_reasoner_failed(reasoner: &str, error: &dyn std::fmt::Display) {
    warn!(event = "reasoner.failed", reasoner = %reasoner, error = %error);
}

/// Emit event: a backend request will be retried (warning level).
pub fn emit_backend_retry(attempt: u32, delay_ms: u64, error: &dyn std::fmt::Display) {
    warn!(event = "backend.retry", attempt = attempt, delay_ms = delay_ms, error = %error);
}
