//! Environment handle and lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-assigned, opaque environment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentId(pub String);

impl EnvironmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an environment as seen by one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentState {
    Provisioning,
    Ready,
    Failed,
    /// Only ever set by the provider; the core never tears environments down.
    Destroyed,
}

/// The single environment owned by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandle {
    id: EnvironmentId,
    state: EnvironmentState,
    created_at: DateTime<Utc>,
}

impl EnvironmentHandle {
    /// Wrap a freshly allocated environment; starts in `Provisioning`.
    pub fn new(id: EnvironmentId) -> Self {
        Self {
            id,
            state: EnvironmentState::Provisioning,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &EnvironmentId {
        &self.id
    }

    pub fn state(&self) -> EnvironmentState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_ready(&self) -> bool {
        self.state == EnvironmentState::Ready
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = EnvironmentState::Ready;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = EnvironmentState::Failed;
    }
}
