//! Terminal outcome of a provisioning run.

use super::error::PreviewError;
use super::log::LogEvent;

/// Either a reachable URL or the error that stopped the run, always with logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningResult {
    Success { url: String, logs: Vec<LogEvent> },
    Failure { error: PreviewError, logs: Vec<LogEvent> },
}

impl ProvisioningResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProvisioningResult::Success { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ProvisioningResult::Success { url, .. } => Some(url),
            ProvisioningResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PreviewError> {
        match self {
            ProvisioningResult::Success { .. } => None,
            ProvisioningResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn logs(&self) -> &[LogEvent] {
        match self {
            ProvisioningResult::Success { logs, .. } => logs,
            ProvisioningResult::Failure { logs, .. } => logs,
        }
    }

    /// Plain log lines in order.
    pub fn log_lines(&self) -> Vec<String> {
        self.logs().iter().map(|e| e.line.clone()).collect()
    }
}
