//! Dev-server launch: fire and forget.

use tracing::{info, warn};

use crate::config::PreviewConfig;
use crate::domain::{EnvironmentHandle, PreviewError};
use crate::provider::{CommandOutcome, CommandSpec, ExecutionProvider};

/// Starts the dev server as a background process.
#[derive(Debug, Clone)]
pub struct Launcher {
    command: CommandSpec,
}

impl Launcher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: CommandSpec::background(command),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.dev_command.clone())
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Return as soon as the process has been started. Server readiness is
    /// not awaited here.
    pub async fn launch(
        &self,
        provider: &dyn ExecutionProvider,
        handle: &EnvironmentHandle,
    ) -> Result<(), PreviewError> {
        match provider.run_command(handle.id(), &self.command, None).await {
            Ok(CommandOutcome::Started) | Ok(CommandOutcome::Exited { exit_code: 0 }) => {
                info!(env_id = %handle.id(), command = %self.command.command, "Dev server started");
                Ok(())
            }
            Ok(CommandOutcome::Exited { exit_code }) => {
                warn!(env_id = %handle.id(), exit_code, "Dev server exited immediately");
                Err(PreviewError::Launch {
                    reason: format!("process exited with code {}", exit_code),
                })
            }
            Err(e) => {
                warn!(env_id = %handle.id(), error = %e, "Dev server could not be spawned");
                Err(PreviewError::Launch {
                    reason: e.to_string(),
                })
            }
        }
    }
}
