//! In-memory fake provider (testing only)
//!
//! `MemoryProvider` satisfies the [`ExecutionProvider`] contract without any
//! processes or filesystem. Every call is recorded, and failures, install
//! output and delays can be scripted per instance.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::EnvironmentId;
use crate::provider::*;

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateEnvironment,
    MakeDirectory { env: String, path: String },
    WriteFile { env: String, path: String },
    RunCommand { env: String, command: String, background: bool },
    ExternalHost { env: String, port: u16 },
}

#[derive(Debug, Default)]
struct EnvState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone)]
struct Script {
    create_failure: Option<String>,
    write_failure: Option<String>,
    install_output: Vec<(OutputStream, String)>,
    install_exit_code: i32,
    install_spawn_failure: Option<String>,
    install_delay: Option<Duration>,
    launch_failure: Option<String>,
}

// ---------------------------------------------------------------------------
// MemoryProvider
// ---------------------------------------------------------------------------

/// In-memory provider backed by a `HashMap<env_id, EnvState>`.
///
/// Foreground commands play back the scripted install output; background
/// commands succeed immediately unless a launch failure is scripted.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    script: Script,
    calls: Mutex<Vec<ProviderCall>>,
    envs: Mutex<HashMap<String, EnvState>>,
    next_id: AtomicU64,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// `create_environment` fails with `reason`.
    pub fn failing_create(mut self, reason: impl Into<String>) -> Self {
        self.script.create_failure = Some(reason.into());
        self
    }

    /// Writing exactly `path` fails.
    pub fn failing_write(mut self, path: impl Into<String>) -> Self {
        self.script.write_failure = Some(path.into());
        self
    }

    /// Append a line to the install output, emitted in call order.
    pub fn with_install_output(mut self, stream: OutputStream, line: impl Into<String>) -> Self {
        self.script.install_output.push((stream, line.into()));
        self
    }

    pub fn with_install_exit_code(mut self, exit_code: i32) -> Self {
        self.script.install_exit_code = exit_code;
        self
    }

    /// Install keeps running for `delay` after its output.
    pub fn with_install_delay(mut self, delay: Duration) -> Self {
        self.script.install_delay = Some(delay);
        self
    }

    /// The install command cannot be spawned.
    pub fn failing_install_spawn(mut self, reason: impl Into<String>) -> Self {
        self.script.install_spawn_failure = Some(reason.into());
        self
    }

    /// The background dev-server command cannot be spawned.
    pub fn failing_launch(mut self, reason: impl Into<String>) -> Self {
        self.script.launch_failure = Some(reason.into());
        self
    }

    /// Snapshot of recorded calls in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded `run_command` calls as `(command, background)`.
    pub fn commands(&self) -> Vec<(String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::RunCommand {
                    command,
                    background,
                    ..
                } => Some((command, background)),
                _ => None,
            })
            .collect()
    }

    pub fn environment_count(&self) -> usize {
        self.envs.lock().unwrap().len()
    }

    /// Contents of a file written into `env`.
    pub fn file(&self, env: &EnvironmentId, path: &str) -> Option<String> {
        let envs = self.envs.lock().unwrap();
        envs.get(env.as_str())?.files.get(path).cloned()
    }

    /// Whether `path` was created as a directory in `env`.
    pub fn has_dir(&self, env: &EnvironmentId, path: &str) -> bool {
        let envs = self.envs.lock().unwrap();
        envs.get(env.as_str())
            .map(|e| e.dirs.contains(path))
            .unwrap_or(false)
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn with_env<T>(
        &self,
        env: &EnvironmentId,
        f: impl FnOnce(&mut EnvState) -> T,
    ) -> ProviderResult<T> {
        let mut envs = self.envs.lock().unwrap();
        let state = envs
            .get_mut(env.as_str())
            .ok_or_else(|| ProviderError::UnknownEnvironment(env.to_string()))?;
        Ok(f(state))
    }

    async fn play_install(&self, output: Option<OutputSender>) -> ProviderResult<CommandOutcome> {
        if let Some(reason) = &self.script.install_spawn_failure {
            return Err(ProviderError::Spawn {
                command: "install".to_string(),
                reason: reason.clone(),
            });
        }

        let base = Utc::now();
        if let Some(tx) = output {
            for (i, (stream, line)) in self.script.install_output.iter().enumerate() {
                let _ = tx.send(OutputLine {
                    stream: *stream,
                    line: line.clone(),
                    timestamp: base + chrono::Duration::milliseconds(i as i64),
                });
                tokio::task::yield_now().await;
            }
        }

        if let Some(delay) = self.script.install_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(CommandOutcome::Exited {
            exit_code: self.script.install_exit_code,
        })
    }
}

#[async_trait]
impl ExecutionProvider for MemoryProvider {
    async fn create_environment(&self) -> ProviderResult<EnvironmentId> {
        self.record(ProviderCall::CreateEnvironment);
        if let Some(reason) = &self.script.create_failure {
            return Err(ProviderError::Allocation(reason.clone()));
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("env-{}", n);
        self.envs
            .lock()
            .unwrap()
            .insert(id.clone(), EnvState::default());
        Ok(EnvironmentId(id))
    }

    async fn make_directory(&self, env: &EnvironmentId, path: &str) -> ProviderResult<()> {
        self.record(ProviderCall::MakeDirectory {
            env: env.to_string(),
            path: path.to_string(),
        });
        self.with_env(env, |state| {
            state.dirs.insert(path.to_string());
        })
    }

    async fn write_file(
        &self,
        env: &EnvironmentId,
        path: &str,
        contents: &str,
    ) -> ProviderResult<()> {
        self.record(ProviderCall::WriteFile {
            env: env.to_string(),
            path: path.to_string(),
        });
        if self.script.write_failure.as_deref() == Some(path) {
            return Err(ProviderError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("scripted write failure for {}", path),
            )));
        }
        self.with_env(env, |state| {
            state.files.insert(path.to_string(), contents.to_string());
        })
    }

    async fn run_command(
        &self,
        env: &EnvironmentId,
        command: &CommandSpec,
        output: Option<OutputSender>,
    ) -> ProviderResult<CommandOutcome> {
        self.record(ProviderCall::RunCommand {
            env: env.to_string(),
            command: command.command.clone(),
            background: command.background,
        });
        self.with_env(env, |_| ())?;

        if command.background {
            return match &self.script.launch_failure {
                Some(reason) => Err(ProviderError::Spawn {
                    command: command.command.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(CommandOutcome::Started),
            };
        }
        self.play_install(output).await
    }

    fn external_host(&self, env: &EnvironmentId, port: u16) -> String {
        self.record(ProviderCall::ExternalHost {
            env: env.to_string(),
            port,
        });
        format!("{}-{}.sandbox.test", port, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_memory_provider_records_calls() {
        let provider = MemoryProvider::new();
        let env = provider.create_environment().await.unwrap();
        provider.make_directory(&env, "src").await.unwrap();
        provider.write_file(&env, "src/App.tsx", "x").await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![
                ProviderCall::CreateEnvironment,
                ProviderCall::MakeDirectory {
                    env: "env-1".into(),
                    path: "src".into()
                },
                ProviderCall::WriteFile {
                    env: "env-1".into(),
                    path: "src/App.tsx".into()
                },
            ]
        );
        assert!(provider.has_dir(&env, "src"));
        assert_eq!(provider.file(&env, "src/App.tsx").as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_memory_provider_unknown_environment() {
        let provider = MemoryProvider::new();
        let err = provider
            .write_file(&EnvironmentId("nope".into()), "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownEnvironment(_)));
    }

    #[tokio::test]
    async fn test_memory_provider_plays_install_output() {
        let provider = MemoryProvider::new()
            .with_install_output(OutputStream::Stdout, "a")
            .with_install_output(OutputStream::Stderr, "b")
            .with_install_exit_code(2);
        let env = provider.create_environment().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = provider
            .run_command(&env, &CommandSpec::foreground("npm install"), Some(tx))
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Exited { exit_code: 2 });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.line, "a");
        assert_eq!(second.stream, OutputStream::Stderr);
        assert!(first.timestamp < second.timestamp);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_provider_ids_are_unique() {
        let provider = MemoryProvider::new();
        let a = provider.create_environment().await.unwrap();
        let b = provider.create_environment().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(provider.environment_count(), 2);
    }
}
