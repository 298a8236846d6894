//! Provisioning configuration.
//!
//! Loaded from TOML (every field optional) and then overridden from
//! `GRAPHBOX_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable names read by [`PreviewConfig::apply_env_overrides`].
pub mod env_keys {
    pub const DEV_PORT: &str = "GRAPHBOX_DEV_PORT";
    pub const TIMEOUT_SECS: &str = "GRAPHBOX_TIMEOUT_SECS";
    pub const INSTALL_COMMAND: &str = "GRAPHBOX_INSTALL_COMMAND";
    pub const DEV_COMMAND: &str = "GRAPHBOX_DEV_COMMAND";
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Optional wait for the dev server to answer before reporting success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub enabled: bool,
    /// Total time allowed for the readiness check (milliseconds).
    pub timeout_ms: u64,
    /// Delay between readiness attempts (milliseconds).
    pub interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 15_000,
            interval_ms: 500,
        }
    }
}

/// Configuration for one orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Port the dev server listens on inside the environment.
    pub dev_server_port: u16,

    /// Port the externally visible connection arrives on.
    pub external_port: u16,

    /// Overall wall-clock budget per request in seconds (0 = unlimited).
    pub timeout_secs: u64,

    /// Foreground dependency install command.
    pub install_command: String,

    /// Background dev-server command.
    pub dev_command: String,

    /// `name` field of the generated manifest.
    pub project_name: String,

    pub readiness: ReadinessConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            dev_server_port: 5173,
            external_port: 443,
            timeout_secs: 60,
            install_command: "npm install".to_string(),
            dev_command: "npm run dev -- --host".to_string(),
            project_name: "graph-app".to_string(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl PreviewConfig {
    /// Parse from a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PreviewConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply `GRAPHBOX_*` overrides from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by tests).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(env_keys::DEV_PORT) {
            self.dev_server_port = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a port: {}", env_keys::DEV_PORT, raw))
            })?;
        }
        if let Some(raw) = lookup(env_keys::TIMEOUT_SECS) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} is not a number of seconds: {}",
                    env_keys::TIMEOUT_SECS,
                    raw
                ))
            })?;
        }
        if let Some(cmd) = lookup(env_keys::INSTALL_COMMAND) {
            self.install_command = cmd;
        }
        if let Some(cmd) = lookup(env_keys::DEV_COMMAND) {
            self.dev_command = cmd;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dev_server_port == 0 {
            return Err(ConfigError::Invalid("dev_server_port must be non-zero".into()));
        }
        if self.external_port == 0 {
            return Err(ConfigError::Invalid("external_port must be non-zero".into()));
        }
        if self.install_command.trim().is_empty() {
            return Err(ConfigError::Invalid("install_command must not be empty".into()));
        }
        if self.dev_command.trim().is_empty() {
            return Err(ConfigError::Invalid("dev_command must not be empty".into()));
        }
        if self.readiness.enabled && self.readiness.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "readiness.interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Overall budget, `None` when unlimited.
    pub fn budget(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
