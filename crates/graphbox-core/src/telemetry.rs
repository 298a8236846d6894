//! Tracing setup for graphbox binaries.
//!
//! [`init_tracing`] installs the global subscriber. Provisioning events are
//! emitted inside the per-run span (see [`crate::obs::provision_span`]), so
//! the JSON format carries the current span to keep `run_id` on every line.
//! HTTP client internals are capped at `warn` unless `RUST_LOG` says
//! otherwise; at `debug` they would drown the readiness polling.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Targets logged no louder than `warn` by default.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// How diagnostics are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON with the current span flattened in.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let noisy = std::cmp::min(level, Level::WARN);
    let mut directives = level.as_str().to_ascii_lowercase();
    for target in NOISY_TARGETS {
        directives.push_str(&format!(",{}={}", target, noisy.as_str().to_ascii_lowercase()));
    }
    directives
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Returns `false` when one was already set.
///
/// Output goes to stderr so stdout stays free for command results.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let filter = build_filter(level);
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                layer
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cap_http_internals() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("hyper=warn"));
        assert!(directives.contains("reqwest=warn"));
    }

    #[test]
    fn test_default_directives_never_louder_than_level() {
        let directives = default_directives(Level::ERROR);
        assert!(directives.starts_with("error,"));
        assert!(directives.contains("hyper=error"));
        assert!(!directives.contains("=warn"));
    }

    #[test]
    fn test_json_flag_maps_to_format() {
        assert_eq!(LogFormat::from_json_flag(true), LogFormat::Json);
        assert_eq!(LogFormat::from_json_flag(false), LogFormat::default());
    }

    #[test]
    fn test_second_install_is_refused() {
        // Another test may already own the global subscriber.
        init_tracing(LogFormat::Text, Level::INFO);
        assert!(!init_tracing(LogFormat::Json, Level::DEBUG));
    }
}
