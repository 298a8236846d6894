//! Generation request: the accepted input of one provisioning run.

use serde::{Deserialize, Serialize};

/// Application source plus the packages it needs.
///
/// Immutable once accepted: fields are private and only readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    source_code: String,
    dependencies: Vec<String>,
}

impl GenerationRequest {
    /// Accept a request. The source is opaque text and is never inspected.
    pub fn new(source_code: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            source_code: source_code.into(),
            dependencies,
        }
    }

    /// Root application module contents, verbatim.
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    /// Caller-supplied package names in the order given (duplicates kept).
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
