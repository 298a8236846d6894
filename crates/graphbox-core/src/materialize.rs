//! Write a project file set into an environment, in order.

use tracing::debug;

use crate::domain::{EnvironmentHandle, FileOp, PreviewError, ProjectFileSet};
use crate::provider::ExecutionProvider;

/// Apply every operation of `file_set` sequentially.
///
/// The set is checked up front: a file whose parent directory is created
/// later in the set is rejected before anything is issued. Each operation
/// completes before the next starts. The first failure stops the stage; no
/// rollback is attempted.
pub async fn materialize(
    provider: &dyn ExecutionProvider,
    handle: &EnvironmentHandle,
    file_set: &ProjectFileSet,
) -> Result<(), PreviewError> {
    if let Err(violation) = file_set.check_order() {
        return Err(PreviewError::Materialize {
            path: violation.file,
            reason: format!(
                "parent directory {} is created after the file",
                violation.directory
            ),
        });
    }

    for op in file_set.ops() {
        let result = match op {
            FileOp::CreateDir { path } => provider.make_directory(handle.id(), path).await,
            FileOp::WriteFile { path, contents } => {
                provider.write_file(handle.id(), path, contents).await
            }
        };
        result.map_err(|e| PreviewError::Materialize {
            path: op.path().to_string(),
            reason: e.to_string(),
        })?;
        debug!(env_id = %handle.id(), path = %op.path(), "Materialized");
    }

    Ok(())
}
