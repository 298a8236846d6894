//! Observability tests for provisioning run tracing.
//!
//! The emit functions and the run span must be safe to call under a
//! capturing subscriber, including from inside a full run.

use std::sync::Arc;

use graphbox_core::fakes::MemoryProvider;
use graphbox_core::obs::{
    emit_dependency_skipped, emit_log_line, emit_provision_failed, emit_provision_finished,
    emit_provision_started, emit_scaffolded, emit_stage_entered,
};
use graphbox_core::{
    provision_span, GenerationRequest, LogOrigin, Orchestrator, PreviewConfig, PreviewError,
    Stage,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_started_and_scaffolded() {
    emit_provision_started("run-123", 3);
    emit_scaffolded(
        "run-123",
        9,
        "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
    );
}

#[traced_test]
#[test]
fn test_emit_dependency_skipped() {
    emit_dependency_skipped("run-123", "two words");
}

#[traced_test]
#[test]
fn test_emit_stage_entered_every_stage() {
    let mut stage = Some(Stage::Provisioning);
    while let Some(current) = stage {
        emit_stage_entered("run-456", current);
        stage = current.next();
    }
}

#[traced_test]
#[test]
fn test_emit_finished_and_failed() {
    emit_provision_finished("run-789", "https://5173-env.example.test", 1200, 14);
    let err = PreviewError::Install { exit_code: 1 };
    emit_provision_failed("run-789", Stage::Installing, &err);
}

#[traced_test]
#[test]
fn test_emit_log_line_with_non_ascii() {
    emit_log_line("run-abc", LogOrigin::InstallStderr, 7, "✖ peer dependency missing");
}

#[traced_test]
#[test]
fn test_provision_span_enter() {
    let span = provision_span("span-run");
    let _guard = span.enter();
}

#[traced_test]
#[tokio::test]
async fn test_full_run_under_capturing_subscriber() {
    let orch = Orchestrator::new(Arc::new(MemoryProvider::new()), PreviewConfig::default());
    let result = orch
        .run(&GenerationRequest::new("export default () => null", vec![]), None)
        .await;
    assert!(result.is_success());
}
