//! Provisioning orchestration.
//!
//! Sequences provision -> scaffold -> materialize -> install -> launch ->
//! resolve inside one task, under one overall time budget. Any stage failure
//! ends the run immediately; the partially provisioned environment is left
//! to the provider's own lifecycle policy.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::config::PreviewConfig;
use crate::domain::{
    EnvironmentHandle, GenerationRequest, LogObserver, LogStream, PreviewError,
    ProvisioningResult, Stage,
};
use crate::install::Installer;
use crate::launch::Launcher;
use crate::materialize::materialize;
use crate::obs;
use crate::provider::ExecutionProvider;
use crate::provision::provision;
use crate::resolve::{resolve_url, ReadinessCheck};
use crate::scaffold::Scaffolder;

pub const MSG_STARTING: &str = "Starting sandbox creation...";
pub const MSG_CREATED: &str = "Sandbox created...";
pub const MSG_WRITING: &str = "Writing project files...";
pub const MSG_INSTALLING: &str = "Installing dependencies... (this may take a minute)";
pub const MSG_STARTING_SERVER: &str = "Starting dev server...";
pub const MSG_WAITING: &str = "Waiting for dev server to respond...";
pub const MSG_SKIPPED_DEPENDENCY: &str = "Skipping invalid dependency:";

/// Current stage of one run, with transition logging.
struct StageTracker {
    run_id: String,
    current: Stage,
}

impl StageTracker {
    fn enter(&mut self, stage: Stage) {
        self.current = stage;
        obs::emit_stage_entered(&self.run_id, stage);
    }
}

/// Everything one run owns. Kept outside the stage future so that it
/// survives a timeout or cancellation.
struct RunState {
    tracker: StageTracker,
    logs: LogStream,
    handle: Option<EnvironmentHandle>,
}

/// Why the stage sequence stopped early.
enum Halt {
    Failed(PreviewError),
    TimedOut(Duration),
    Cancelled,
}

/// Drives provisioning runs against one provider.
///
/// Holds no per-request state; concurrent runs on the same orchestrator are
/// independent.
pub struct Orchestrator {
    provider: Arc<dyn ExecutionProvider>,
    config: PreviewConfig,
    scaffolder: Scaffolder,
    installer: Installer,
    launcher: Launcher,
    readiness: Option<ReadinessCheck>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn ExecutionProvider>, config: PreviewConfig) -> Self {
        let readiness = config
            .readiness
            .enabled
            .then(|| ReadinessCheck::new(&config.readiness));
        Self {
            provider,
            scaffolder: Scaffolder::from_config(&config),
            installer: Installer::from_config(&config),
            launcher: Launcher::from_config(&config),
            readiness,
            config,
        }
    }

    /// Replace the scaffolder (for a custom baseline).
    pub fn with_scaffolder(mut self, scaffolder: Scaffolder) -> Self {
        self.scaffolder = scaffolder;
        self
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Run to completion, bounded only by the configured budget.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        observer: Option<Arc<dyn LogObserver>>,
    ) -> ProvisioningResult {
        self.run_until(request, observer, std::future::pending::<()>())
            .await
    }

    /// Run until done, the budget expires, or `cancelled` resolves.
    ///
    /// Cancelling only stops this wait and the log forwarding. Side effects
    /// already issued (an install or a dev server in flight) keep running in
    /// the environment unless the provider is told to tear it down.
    pub async fn run_until<C>(
        &self,
        request: &GenerationRequest,
        observer: Option<Arc<dyn LogObserver>>,
        cancelled: C,
    ) -> ProvisioningResult
    where
        C: Future<Output = ()>,
    {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::provision_span(&run_id);
        self.run_inner(run_id, request, observer, cancelled)
            .instrument(span)
            .await
    }

    async fn run_inner<C>(
        &self,
        run_id: String,
        request: &GenerationRequest,
        observer: Option<Arc<dyn LogObserver>>,
        cancelled: C,
    ) -> ProvisioningResult
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut state = RunState {
            tracker: StageTracker {
                run_id: run_id.clone(),
                current: Stage::Provisioning,
            },
            logs: LogStream::new(run_id.clone(), observer),
            handle: None,
        };

        let budget = self.config.budget();
        let deadline = async {
            match budget {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        // The stage future borrows `state`; it is dropped when select! returns.
        let outcome = tokio::select! {
            res = self.drive(request, &mut state) => res.map_err(Halt::Failed),
            _ = deadline => Err(Halt::TimedOut(budget.unwrap_or_default())),
            _ = cancelled => Err(Halt::Cancelled),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(url) => {
                state.tracker.enter(Stage::Done);
                obs::emit_provision_finished(&run_id, &url, duration_ms, state.logs.len());
                ProvisioningResult::Success {
                    url,
                    logs: state.logs.into_events(),
                }
            }
            Err(halt) => {
                let stage = state.tracker.current;
                let error = match halt {
                    Halt::Failed(e) => e,
                    Halt::TimedOut(limit) => PreviewError::Timeout {
                        stage,
                        limit_ms: limit.as_millis() as u64,
                    },
                    Halt::Cancelled => PreviewError::Cancelled { stage },
                };
                if let Some(handle) = state.handle.as_mut() {
                    handle.mark_failed();
                }
                obs::emit_provision_failed(&run_id, stage, &error);
                state.tracker.enter(Stage::Failed);
                ProvisioningResult::Failure {
                    error,
                    logs: state.logs.into_events(),
                }
            }
        }
    }

    /// The linear stage sequence. Returns the resolved URL.
    async fn drive(
        &self,
        request: &GenerationRequest,
        state: &mut RunState,
    ) -> Result<String, PreviewError> {
        let provider = self.provider.as_ref();

        obs::emit_provision_started(&state.tracker.run_id, request.dependencies().len());
        state.tracker.enter(Stage::Provisioning);
        state.logs.system(MSG_STARTING);
        let handle = state.handle.insert(provision(provider).await?);
        state.logs.system(MSG_CREATED);

        state.tracker.enter(Stage::Scaffolding);
        for raw in self.scaffolder.rejected_dependencies(request.dependencies()) {
            obs::emit_dependency_skipped(&state.tracker.run_id, raw);
            state
                .logs
                .system(format!("{} {}", MSG_SKIPPED_DEPENDENCY, raw));
        }
        let file_set = self
            .scaffolder
            .scaffold(request.source_code(), request.dependencies());
        obs::emit_scaffolded(&state.tracker.run_id, file_set.len(), &file_set.digest());

        state.tracker.enter(Stage::Materializing);
        state.logs.system(MSG_WRITING);
        materialize(provider, handle, &file_set).await?;

        state.tracker.enter(Stage::Installing);
        state.logs.system(MSG_INSTALLING);
        self.installer
            .install(provider, handle, &mut state.logs)
            .await?;

        state.tracker.enter(Stage::Launching);
        state.logs.system(MSG_STARTING_SERVER);
        self.launcher.launch(provider, handle).await?;

        state.tracker.enter(Stage::Resolving);
        let url = resolve_url(provider, handle, self.config.dev_server_port);
        if let Some(readiness) = &self.readiness {
            state.logs.system(MSG_WAITING);
            readiness.wait(&url).await?;
        }
        state.logs.system(format!("Preview available at {}", url));

        Ok(url)
    }
}
