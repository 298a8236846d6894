//! Provisioning stages of the orchestration state machine.

use serde::{Deserialize, Serialize};

/// One step of a provisioning run.
///
/// Transitions are strictly `stage -> next()` on success or `-> Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Provisioning,
    Scaffolding,
    Materializing,
    Installing,
    Launching,
    Resolving,
    Done,
    Failed,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Provisioning => "provisioning",
            Stage::Scaffolding => "scaffolding",
            Stage::Materializing => "materializing",
            Stage::Installing => "installing",
            Stage::Launching => "launching",
            Stage::Resolving => "resolving",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// The stage entered after this one succeeds. `None` for terminal stages.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Provisioning => Some(Stage::Scaffolding),
            Stage::Scaffolding => Some(Stage::Materializing),
            Stage::Materializing => Some(Stage::Installing),
            Stage::Installing => Some(Stage::Launching),
            Stage::Launching => Some(Stage::Resolving),
            Stage::Resolving => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
