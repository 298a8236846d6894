//! Log events and the per-run log stream.
//!
//! A run has exactly one [`LogStream`]. Every line goes through
//! [`LogStream::push`], which appends it to the history, forwards it to the
//! observer and mirrors it to `tracing`. The stream is consumed when the
//! terminal result is built, so the observer cannot be called afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a log line came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogOrigin {
    /// Phase markers emitted by the orchestrator.
    System,
    /// Standard output of the dependency install process.
    InstallStdout,
    /// Standard error of the dependency install process.
    InstallStderr,
}

impl LogOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOrigin::System => "system",
            LogOrigin::InstallStdout => "install-stdout",
            LogOrigin::InstallStderr => "install-stderr",
        }
    }
}

/// A single timestamped, origin-tagged line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    /// Position in the run's history, starting at 1.
    pub seq: u64,
    /// Non-decreasing within a run.
    pub timestamp: DateTime<Utc>,
    pub origin: LogOrigin,
    pub line: String,
}

/// External sink for progress lines.
pub trait LogObserver: Send + Sync {
    fn on_line(&self, line: &str);
}

impl<F> LogObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_line(&self, line: &str) {
        self(line)
    }
}

/// Append-only log history of one run.
pub struct LogStream {
    run_id: String,
    events: Vec<LogEvent>,
    observer: Option<Arc<dyn LogObserver>>,
}

impl LogStream {
    pub fn new(run_id: impl Into<String>, observer: Option<Arc<dyn LogObserver>>) -> Self {
        Self {
            run_id: run_id.into(),
            events: Vec::new(),
            observer,
        }
    }

    /// Emit a phase marker stamped now.
    pub fn system(&mut self, line: impl Into<String>) {
        self.push(LogOrigin::System, line.into(), Utc::now());
    }

    /// Append a line, forward it to the observer, mirror it to tracing.
    ///
    /// A timestamp earlier than the previous event is clamped up to it.
    pub fn push(&mut self, origin: LogOrigin, line: String, timestamp: DateTime<Utc>) {
        let timestamp = match self.events.last() {
            Some(last) if last.timestamp > timestamp => last.timestamp,
            _ => timestamp,
        };
        let seq = self.events.len() as u64 + 1;

        crate::obs::emit_log_line(&self.run_id, origin, seq, &line);
        if let Some(observer) = &self.observer {
            observer.on_line(&line);
        }

        self.events.push(LogEvent {
            seq,
            timestamp,
            origin,
            line,
        });
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Close the stream, detaching the observer.
    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("run_id", &self.run_id)
            .field("events", &self.events.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    #[test]
    fn test_push_assigns_sequence_and_forwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn LogObserver> =
            Arc::new(move |line: &str| sink.lock().unwrap().push(line.to_string()));

        let mut stream = LogStream::new("run-1", Some(observer));
        stream.system("Starting sandbox creation...");
        stream.push(LogOrigin::InstallStdout, "added 1 package".into(), Utc::now());

        let events = stream.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
        assert_eq!(events[1].origin, LogOrigin::InstallStdout);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Starting sandbox creation...", "added 1 package"]
        );
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut stream = LogStream::new("run-2", None);
        let now = Utc::now();
        stream.push(LogOrigin::System, "first".into(), now);
        stream.push(LogOrigin::InstallStderr, "late".into(), now - Duration::seconds(5));

        let events = stream.events();
        assert_eq!(events[1].timestamp, now);
        assert!(events[0].timestamp <= events[1].timestamp);
    }

    #[test]
    fn test_origin_labels() {
        assert_eq!(LogOrigin::System.as_str(), "system");
        assert_eq!(LogOrigin::InstallStdout.as_str(), "install-stdout");
        assert_eq!(LogOrigin::InstallStderr.as_str(), "install-stderr");
    }
}
