//! Endpoint resolution and optional readiness polling.

use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ReadinessConfig;
use crate::domain::{EnvironmentHandle, PreviewError};
use crate::provider::ExecutionProvider;

/// Externally routable HTTPS URL for `port` on this environment.
///
/// Deterministic; the provider's `external_host` does no I/O.
pub fn resolve_url(provider: &dyn ExecutionProvider, handle: &EnvironmentHandle, port: u16) -> String {
    debug_assert!(handle.is_ready(), "resolving a URL for a handle that is not ready");
    format!("https://{}", provider.external_host(handle.id(), port))
}

/// Bounded polling wait against a resolved URL.
///
/// The external endpoint sits behind the provider's proxy, which answers
/// 502/503/504 until the dev server accepts connections. Those and
/// connection-level failures are retried; any other response counts as
/// reachable.
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    client: reqwest::Client,
    timeout: Duration,
    interval: Duration,
}

impl ReadinessCheck {
    pub fn new(config: &ReadinessConfig) -> Self {
        let interval = Duration::from_millis(config.interval_ms.max(1));
        let client = reqwest::Client::builder()
            .timeout(interval.max(Duration::from_secs(2)))
            .build()
            .unwrap_or_default();
        Self {
            client,
            timeout: Duration::from_millis(config.timeout_ms),
            interval,
        }
    }

    /// Poll until the URL answers. Returns the number of attempts made.
    pub async fn wait(&self, url: &str) -> Result<u32, PreviewError> {
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.client.get(url).send().await {
                Ok(response) if !is_upstream_unavailable(response.status()) => {
                    info!(url = %url, status = %response.status(), attempts, "Preview reachable");
                    return Ok(attempts);
                }
                Ok(response) => {
                    debug!(url = %url, attempt = attempts, status = %response.status(), "Upstream not serving yet")
                }
                Err(e) => debug!(url = %url, attempt = attempts, error = %e, "Preview not reachable yet"),
            }

            if Instant::now() + self.interval > deadline {
                return Err(PreviewError::NotReady {
                    url: url.to_string(),
                    attempts,
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Gateway answers meaning the proxy has nothing to forward to yet.
fn is_upstream_unavailable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryProvider;
    use crate::provision::provision;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_resolve_url_is_https_and_deterministic() {
        let provider = MemoryProvider::new();
        let handle = provision(&provider).await.unwrap();

        let url = resolve_url(&provider, &handle, 5173);
        assert!(url.starts_with("https://"));
        assert!(url.contains("5173"));
        assert_eq!(url, resolve_url(&provider, &handle, 5173));
        assert_ne!(url, resolve_url(&provider, &handle, 3000));
    }

    #[tokio::test]
    async fn test_readiness_gives_up_on_closed_port() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let readiness = ReadinessCheck::new(&ReadinessConfig {
            enabled: true,
            timeout_ms: 200,
            interval_ms: 50,
        });
        let err = readiness.wait(&format!("http://{}", addr)).await.unwrap_err();
        match err {
            PreviewError::NotReady { attempts, .. } => assert!(attempts >= 1),
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    /// Serve one canned status line per connection, with `first` for the
    /// first `first_count` connections and `then` afterwards.
    async fn serve_statuses(first: &'static str, first_count: usize, then: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut socket, _)) = listener.accept().await {
                let status = if served < first_count { first } else { then };
                served += 1;
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    fn fast_readiness(timeout_ms: u64) -> ReadinessCheck {
        ReadinessCheck::new(&ReadinessConfig {
            enabled: true,
            timeout_ms,
            interval_ms: 50,
        })
    }

    #[tokio::test]
    async fn test_readiness_succeeds_against_listening_server() {
        let url = serve_statuses("200 OK", 0, "200 OK").await;
        let attempts = fast_readiness(2_000).wait(&url).await.expect("server never became ready");
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_readiness_accepts_application_errors() {
        let url = serve_statuses("404 Not Found", 0, "404 Not Found").await;
        assert_eq!(fast_readiness(2_000).wait(&url).await, Ok(1));
    }

    #[tokio::test]
    async fn test_readiness_treats_bad_gateway_as_not_ready() {
        let url = serve_statuses("502 Bad Gateway", usize::MAX, "502 Bad Gateway").await;
        let err = fast_readiness(300).wait(&url).await.unwrap_err();
        match err {
            PreviewError::NotReady { attempts, .. } => assert!(attempts > 1),
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_readiness_waits_through_gateway_errors() {
        let url = serve_statuses("503 Service Unavailable", 2, "200 OK").await;
        assert_eq!(fast_readiness(5_000).wait(&url).await, Ok(3));
    }

    #[test]
    fn test_upstream_unavailable_statuses() {
        assert!(is_upstream_unavailable(StatusCode::BAD_GATEWAY));
        assert!(is_upstream_unavailable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_upstream_unavailable(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_upstream_unavailable(StatusCode::OK));
        assert!(!is_upstream_unavailable(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
