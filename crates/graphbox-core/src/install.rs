//! Dependency installation with live output forwarding.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::PreviewConfig;
use crate::domain::{EnvironmentHandle, LogOrigin, LogStream, PreviewError};
use crate::provider::{CommandOutcome, CommandSpec, ExecutionProvider, OutputLine, OutputStream};

/// Runs the package manager's install command to completion.
#[derive(Debug, Clone)]
pub struct Installer {
    command: CommandSpec,
}

impl Installer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: CommandSpec::foreground(command),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.install_command.clone())
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Run the install and forward every output line to `logs` as it arrives.
    ///
    /// Lines from stdout and stderr share one channel, so they reach the log
    /// stream in the order the process produced them. Returns once the
    /// process has exited and all of its output has been forwarded.
    pub async fn install(
        &self,
        provider: &dyn ExecutionProvider,
        handle: &EnvironmentHandle,
        logs: &mut LogStream,
    ) -> Result<(), PreviewError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();

        let run = provider.run_command(handle.id(), &self.command, Some(tx));
        let forward = async {
            while let Some(output) = rx.recv().await {
                let origin = match output.stream {
                    OutputStream::Stdout => LogOrigin::InstallStdout,
                    OutputStream::Stderr => LogOrigin::InstallStderr,
                };
                logs.push(origin, output.line, output.timestamp);
            }
        };
        let (outcome, ()) = tokio::join!(run, forward);

        match outcome {
            Ok(CommandOutcome::Exited { exit_code: 0 }) => {
                info!(env_id = %handle.id(), "Dependencies installed");
                Ok(())
            }
            Ok(CommandOutcome::Exited { exit_code }) => {
                warn!(env_id = %handle.id(), exit_code, "Dependency installation failed");
                Err(PreviewError::Install { exit_code })
            }
            Ok(CommandOutcome::Started) => {
                warn!(env_id = %handle.id(), "Provider detached a foreground install");
                Err(PreviewError::Install { exit_code: -1 })
            }
            Err(e) => {
                warn!(env_id = %handle.id(), error = %e, "Install command could not run");
                logs.system(format!("Install command could not run: {}", e));
                Err(PreviewError::Install { exit_code: -1 })
            }
        }
    }
}
