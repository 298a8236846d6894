//! Terminal error taxonomy for a provisioning run.
//!
//! Every variant ends the run; nothing in the core retries.

use super::stage::Stage;

/// Why a provisioning run failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("environment allocation failed: {reason}")]
    Provision { reason: String },

    #[error("failed to write {path}: {reason}")]
    Materialize { path: String, reason: String },

    #[error("dependency installation exited with code {exit_code}")]
    Install { exit_code: i32 },

    #[error("dev server could not be started: {reason}")]
    Launch { reason: String },

    #[error("provisioning timed out during {stage} (limit {limit_ms}ms)")]
    Timeout { stage: Stage, limit_ms: u64 },

    #[error("provisioning cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("preview at {url} not reachable after {attempts} attempt(s)")]
    NotReady { url: String, attempts: u32 },
}

impl PreviewError {
    /// Stable machine-readable class name.
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::Provision { .. } => "provision_error",
            PreviewError::Materialize { .. } => "materialize_error",
            PreviewError::Install { .. } => "install_error",
            PreviewError::Launch { .. } => "launch_error",
            PreviewError::Timeout { .. } => "timeout_error",
            PreviewError::Cancelled { .. } => "cancelled",
            PreviewError::NotReady { .. } => "not_ready",
        }
    }
}
