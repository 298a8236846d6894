//! Structured observability hooks for provisioning runs.
//!
//! This module provides:
//! - A run-scoped tracing span via [`provision_span`]
//! - Emission functions for key lifecycle events: start, stage entry,
//!   scaffolding, finish, failure
//!
//! Events are emitted at `info!` level (log lines at `debug!`), filterable
//! through `RUST_LOG`.

use tracing::{debug, info, warn};

use crate::domain::{LogOrigin, Stage};

/// Span tagged with the run_id; instrument the run's future with it.
pub fn provision_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("graphbox.provision", run_id = %run_id)
}

/// Emit event: run started, before any provider call.
pub fn emit_provision_started(run_id: &str, dependency_count: usize) {
    info!(
        event = "provision.started",
        run_id = %run_id,
        dependencies = dependency_count,
    );
}

/// Emit event: project file set built.
pub fn emit_scaffolded(run_id: &str, operations: usize, file_set_digest: &str) {
    info!(
        event = "provision.scaffolded",
        run_id = %run_id,
        operations = operations,
        file_set = %file_set_digest.get(..12).unwrap_or(file_set_digest),
    );
}

/// Emit event: a caller dependency was left out of the manifest.
pub fn emit_dependency_skipped(run_id: &str, raw: &str) {
    warn!(event = "provision.dependency_skipped", run_id = %run_id, dependency = %raw);
}

/// Emit event: orchestrator entered a stage.
pub fn emit_stage_entered(run_id: &str, stage: Stage) {
    info!(event = "provision.stage_entered", run_id = %run_id, stage = %stage);
}

/// Emit event: run finished with a URL.
pub fn emit_provision_finished(run_id: &str, url: &str, duration_ms: u64, log_lines: usize) {
    info!(
        event = "provision.finished",
        run_id = %run_id,
        url = %url,
        duration_ms = duration_ms,
        log_lines = log_lines,
    );
}

/// Emit event: run failed (warning level).
pub fn emit_provision_failed(run_id: &str, stage: Stage, error: &dyn std::fmt::Display) {
    warn!(event = "provision.failed", run_id = %run_id, stage = %stage, error = %error);
}

/// Mirror of a single log line.
pub fn emit_log_line(run_id: &str, origin: LogOrigin, seq: u64, line: &str) {
    debug!(
        event = "provision.log_line",
        run_id = %run_id,
        origin = origin.as_str(),
        seq = seq,
        "{}",
        line
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_span_create() {
        let span = provision_span("test-run-id");
        let _entered = span.enter();
    }

    #[test]
    fn test_scaffolded_with_short_digest() {
        // Digest shorter than the display width must not panic.
        emit_scaffolded("run-1", 9, "abc");
    }
}
