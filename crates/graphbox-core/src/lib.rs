//! graphbox Core Library
//!
//! Turns a block of generated application source plus a dependency list into
//! a running, publicly reachable dev-server preview.
//!
//! The pipeline is strictly linear; each stage gates the next:
//!
//! ```text
//! provision -> scaffold -> materialize -> install -> launch -> resolve
//! ```
//!
//! The isolated environment itself is supplied by an [`ExecutionProvider`];
//! this crate only depends on that capability set.

pub mod config;
pub mod domain;
pub mod fakes;
pub mod install;
pub mod launch;
pub mod materialize;
pub mod obs;
pub mod orchestrator;
pub mod provider;
pub mod provision;
pub mod resolve;
pub mod scaffold;
pub mod telemetry;
pub mod tool;

pub use config::{ConfigError, PreviewConfig, ReadinessConfig};
pub use domain::{
    EnvironmentHandle, EnvironmentId, EnvironmentState, FileOp, GenerationRequest, LogEvent,
    LogObserver, LogOrigin, LogStream, PackageSpec, PreviewError, ProjectFileSet,
    ProvisioningResult, Stage,
};
pub use install::Installer;
pub use launch::Launcher;
pub use materialize::materialize;
pub use obs::provision_span;
pub use orchestrator::Orchestrator;
pub use provider::{
    CommandOutcome, CommandSpec, ExecutionProvider, OutputLine, OutputSender, OutputStream,
    ProviderError, ProviderResult,
};
pub use provision::provision;
pub use resolve::{resolve_url, ReadinessCheck};
pub use scaffold::{scaffold, Baseline, Scaffolder};
pub use telemetry::{init_tracing, LogFormat};
pub use tool::{execute_generate_graph, tool_definition, ToolRequest, ToolResponse};
