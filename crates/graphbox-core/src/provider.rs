//! Isolated execution provider capability set.
//!
//! The core depends only on this trait. Implementations may be local
//! directories, containers, a VM pool or a remote sandbox API; in-memory
//! fakes live in [`crate::fakes`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::EnvironmentId;

/// Errors reported by a provider implementation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("environment allocation failed: {0}")]
    Allocation(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider error: {0}")]
    Other(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Which output stream a line was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of process output, stamped when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputLine {
    pub fn now(stream: OutputStream, line: impl Into<String>) -> Self {
        Self {
            stream,
            line: line.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Single channel for both streams, so receive order is arrival order.
pub type OutputSender = mpsc::UnboundedSender<OutputLine>;

/// A shell command line to run inside an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Full command line, interpreted by the environment's shell.
    pub command: String,

    /// Start detached and return immediately.
    pub background: bool,
}

impl CommandSpec {
    pub fn foreground(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            background: false,
        }
    }

    pub fn background(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            background: true,
        }
    }
}

/// What `run_command` reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Foreground command ran to completion.
    Exited { exit_code: i32 },

    /// Background command was spawned; nothing more is known.
    Started,
}

/// Capability set the core needs from an isolated execution provider.
///
/// Paths are relative to the environment's project root.
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    /// Allocate a fresh environment.
    async fn create_environment(&self) -> ProviderResult<EnvironmentId>;

    /// Create a directory.
    async fn make_directory(&self, env: &EnvironmentId, path: &str) -> ProviderResult<()>;

    /// Write a file, replacing any existing contents.
    async fn write_file(&self, env: &EnvironmentId, path: &str, contents: &str)
        -> ProviderResult<()>;

    /// Run a command.
    ///
    /// Foreground commands return `Exited` after the process ends, having sent
    /// every output line on `output` in arrival order. Background commands
    /// return `Started` as soon as the process exists.
    async fn run_command(
        &self,
        env: &EnvironmentId,
        command: &CommandSpec,
        output: Option<OutputSender>,
    ) -> ProviderResult<CommandOutcome>;

    /// Externally routable hostname for `port`. Must not perform I/O.
    fn external_host(&self, env: &EnvironmentId, port: u16) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_constructors() {
        let install = CommandSpec::foreground("npm install");
        assert!(!install.background);
        let dev = CommandSpec::background("npm run dev -- --host");
        assert!(dev.background);
        assert_eq!(dev.command, "npm run dev -- --host");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Spawn {
            command: "npm install".into(),
            reason: "not found".into(),
        };
        assert!(err.to_string().contains("npm install"));
        assert!(ProviderError::Allocation("quota exceeded".into())
            .to_string()
            .contains("quota exceeded"));
    }
}
