//! Local-directory execution provider.
//!
//! Environments share the host network, so each one is given its own free
//! TCP port, exported to every command as `PORT`. The scaffolded dev-server
//! config binds that port when it is set. `external_host` names the host
//! port; reaching `https://<port>-<id>.<suffix>` needs an operator-run proxy
//! that terminates TLS and forwards to `127.0.0.1:<port>`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

use graphbox_core::{
    CommandOutcome, CommandSpec, EnvironmentId, ExecutionProvider, OutputLine, OutputSender,
    OutputStream, ProviderError, ProviderResult,
};

use crate::paths::join_relative;

/// Where background command output goes, relative to the environment.
pub const DEV_SERVER_LOG: &str = ".graphbox/dev-server.log";

/// Environment variable carrying the environment's host port.
pub const PORT_ENV: &str = "PORT";

const PORT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct LocalProviderConfig {
    /// Parent directory; each environment is `root/<id>`.
    pub root: PathBuf,
    /// Suffix of external hostnames (`<port>-<id>.<suffix>`).
    pub host_suffix: String,
    /// Shell used as `<shell> -c <command>`.
    pub shell: String,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("graphbox"),
            host_suffix: "localhost".to_string(),
            shell: "sh".to_string(),
        }
    }
}

struct LocalEnvironment {
    dir: PathBuf,
    /// Host port reserved for this environment's dev server.
    port: u16,
    /// Background processes, kept so `destroy` can stop them.
    children: Vec<Child>,
}

/// Provider running everything in local directories.
pub struct LocalProvider {
    config: LocalProviderConfig,
    environments: Mutex<HashMap<String, LocalEnvironment>>,
}

impl LocalProvider {
    pub fn new(config: LocalProviderConfig) -> Self {
        Self {
            config,
            environments: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LocalProviderConfig {
        &self.config
    }

    /// Directory backing `env`, if it is live.
    pub fn environment_dir(&self, env: &EnvironmentId) -> Option<PathBuf> {
        self.lock()
            .get(env.as_str())
            .map(|e| e.dir.clone())
    }

    /// Host port assigned to `env`, if it is live.
    pub fn host_port(&self, env: &EnvironmentId) -> Option<u16> {
        self.lock().get(env.as_str()).map(|e| e.port)
    }

    /// Pick a free local port not held by another live environment.
    ///
    /// The port is released before the dev server binds it, so another
    /// process could still take it in between.
    async fn allocate_port(&self) -> ProviderResult<u16> {
        for _ in 0..PORT_ATTEMPTS {
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
                .await
                .map_err(|e| ProviderError::Allocation(format!("no free port: {}", e)))?;
            let port = listener.local_addr()?.port();
            drop(listener);

            let taken: HashSet<u16> = self.lock().values().map(|e| e.port).collect();
            if !taken.contains(&port) {
                return Ok(port);
            }
        }
        Err(ProviderError::Allocation(
            "could not find a port unused by other environments".to_string(),
        ))
    }

    /// Stop retained background processes and remove the directory.
    ///
    /// Provider-side lifecycle; the orchestrator never calls this.
    pub async fn destroy(&self, env: &EnvironmentId) -> ProviderResult<()> {
        let removed = self
            .lock()
            .remove(env.as_str())
            .ok_or_else(|| ProviderError::UnknownEnvironment(env.to_string()))?;

        for mut child in removed.children {
            if let Err(e) = child.kill().await {
                debug!(env_id = %env, error = %e, "Background process already gone");
            }
        }
        tokio::fs::remove_dir_all(&removed.dir).await?;
        info!(env_id = %env, "Destroyed environment");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LocalEnvironment>> {
        // A poisoned map is still structurally valid.
        self.environments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, env: &EnvironmentId, path: &str) -> ProviderResult<PathBuf> {
        let dir = self
            .environment_dir(env)
            .ok_or_else(|| ProviderError::UnknownEnvironment(env.to_string()))?;
        join_relative(&dir, path)
    }

    fn shell_command(&self, dir: &Path, port: u16, command: &str) -> Command {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(dir)
            .env(PORT_ENV, port.to_string())
            .stdin(Stdio::null());
        cmd
    }

    async fn spawn_background(
        &self,
        env: &EnvironmentId,
        dir: &Path,
        port: u16,
        command: &str,
    ) -> ProviderResult<CommandOutcome> {
        let log_path = join_relative(dir, DEV_SERVER_LOG)?;
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?
            .into_std()
            .await;

        let mut cmd = self.shell_command(dir, port, command);
        cmd.stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log));
        let child = cmd.spawn().map_err(|e| ProviderError::Spawn {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
        info!(env_id = %env, pid = ?child.id(), port, command = %command, "Started background process");

        match self.lock().get_mut(env.as_str()) {
            Some(environment) => environment.children.push(child),
            None => warn!(env_id = %env, "Environment destroyed while spawning"),
        }
        Ok(CommandOutcome::Started)
    }

    async fn run_foreground(
        &self,
        env: &EnvironmentId,
        dir: &Path,
        port: u16,
        command: &str,
        output: Option<OutputSender>,
    ) -> ProviderResult<CommandOutcome> {
        let spawn_err = |reason: String| ProviderError::Spawn {
            command: command.to_string(),
            reason,
        };

        let mut cmd = self.shell_command(dir, port, command);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| spawn_err(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err("failed to capture stderr".to_string()))?;

        let stdout_task = tokio::spawn(forward_lines(stdout, OutputStream::Stdout, output.clone()));
        let stderr_task = tokio::spawn(forward_lines(stderr, OutputStream::Stderr, output));

        let status = child.wait().await?;
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        // Killed by a signal: no exit code.
        let exit_code = status.code().unwrap_or(-1);
        debug!(env_id = %env, command = %command, exit_code, "Foreground command finished");
        Ok(CommandOutcome::Exited { exit_code })
    }
}

/// Read `reader` line by line, stamping each line on arrival.
///
/// Keeps draining after the receiver is gone so the child never blocks on a
/// full pipe.
async fn forward_lines<R>(reader: R, stream: OutputStream, output: Option<OutputSender>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(tx) = &output {
            let _ = tx.send(OutputLine::now(stream, line));
        }
    }
}

#[async_trait]
impl ExecutionProvider for LocalProvider {
    async fn create_environment(&self) -> ProviderResult<EnvironmentId> {
        let id = Uuid::new_v4().to_string();
        let dir = self.config.root.join(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ProviderError::Allocation(format!("{}: {}", dir.display(), e)))?;
        let port = self.allocate_port().await?;

        self.lock().insert(
            id.clone(),
            LocalEnvironment {
                dir: dir.clone(),
                port,
                children: Vec::new(),
            },
        );
        info!(env_id = %id, dir = %dir.display(), port, "Created environment");
        Ok(EnvironmentId(id))
    }

    async fn make_directory(&self, env: &EnvironmentId, path: &str) -> ProviderResult<()> {
        let target = self.resolve(env, path)?;
        tokio::fs::create_dir_all(&target).await?;
        Ok(())
    }

    async fn write_file(
        &self,
        env: &EnvironmentId,
        path: &str,
        contents: &str,
    ) -> ProviderResult<()> {
        let target = self.resolve(env, path)?;
        tokio::fs::write(&target, contents).await?;
        Ok(())
    }

    async fn run_command(
        &self,
        env: &EnvironmentId,
        command: &CommandSpec,
        output: Option<OutputSender>,
    ) -> ProviderResult<CommandOutcome> {
        let (dir, port) = self
            .lock()
            .get(env.as_str())
            .map(|e| (e.dir.clone(), e.port))
            .ok_or_else(|| ProviderError::UnknownEnvironment(env.to_string()))?;

        if command.background {
            self.spawn_background(env, &dir, port, &command.command)
                .await
        } else {
            self.run_foreground(env, &dir, port, &command.command, output)
                .await
        }
    }

    /// `<host_port>-<id>.<suffix>`. The in-environment `port` maps onto the
    /// environment's own host port; it is used as-is only for unknown ids.
    fn external_host(&self, env: &EnvironmentId, port: u16) -> String {
        let port = self.host_port(env).unwrap_or(port);
        format!("{}-{}.{}", port, env, self.config.host_suffix)
    }
}
