//! Domain models for graphbox.
//!
//! Canonical definitions for the core entities:
//! - `GenerationRequest`: Immutable source + dependency input
//! - `ProjectFileSet`: Ordered directory/file operations for one project
//! - `EnvironmentHandle`: The single isolated environment owned by a run
//! - `LogEvent`: Timestamped, origin-tagged progress line
//! - `ProvisioningResult`: Terminal outcome of a run

pub mod environment;
pub mod error;
pub mod file_set;
pub mod log;
pub mod package;
pub mod request;
pub mod result;
pub mod stage;

// Re-export main types and errors
pub use environment::{EnvironmentHandle, EnvironmentId, EnvironmentState};
pub use error::PreviewError;
pub use file_set::{FileOp, OrderViolation, ProjectFileSet};
pub use log::{LogEvent, LogObserver, LogOrigin, LogStream};
pub use package::PackageSpec;
pub use request::GenerationRequest;
pub use result::ProvisioningResult;
pub use stage::Stage;
