//! Environment provisioning: allocate one fresh environment per run.

use tracing::{debug, warn};

use crate::domain::{EnvironmentHandle, PreviewError};
use crate::provider::ExecutionProvider;

/// Ask the provider for a new environment and return its handle in `Ready`.
///
/// No retry: an allocation failure ends the run.
pub async fn provision(provider: &dyn ExecutionProvider) -> Result<EnvironmentHandle, PreviewError> {
    match provider.create_environment().await {
        Ok(id) => {
            let mut handle = EnvironmentHandle::new(id);
            handle.mark_ready();
            debug!(env_id = %handle.id(), "Environment allocated");
            Ok(handle)
        }
        Err(e) => {
            warn!(error = %e, "Environment allocation failed");
            Err(PreviewError::Provision {
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentState;
    use crate::fakes::MemoryProvider;

    #[tokio::test]
    async fn test_provision_returns_ready_handle() {
        let provider = MemoryProvider::new();
        let handle = provision(&provider).await.expect("provision failed");
        assert_eq!(handle.state(), EnvironmentState::Ready);
        assert_eq!(provider.environment_count(), 1);
    }

    #[tokio::test]
    async fn test_provision_failure_maps_to_provision_error() {
        let provider = MemoryProvider::new().failing_create("quota exceeded");
        let err = provision(&provider).await.unwrap_err();
        match err {
            PreviewError::Provision { reason } => assert!(reason.contains("quota exceeded")),
            other => panic!("expected Provision, got {:?}", other),
        }
    }
}
