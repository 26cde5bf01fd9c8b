//! Error reporting sink
//!
//! Workers never log errors themselves; they hand them to an [`ErrorReporter`].
//! The default [`TracingReporter`] logs per-operation errors at `warn` and fatal
//! ones at `error`, each tagged with the error's `kind`.

use crate::error::BenchError;
use std::sync::Mutex;

/// Receiver of errors raised while a benchmark runs
pub trait ErrorReporter: Send + Sync {
    fn report(&self, err: &BenchError);
}

/// Reporter that writes to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &BenchError) {
        if err.is_fatal() {
            tracing::error!(kind = err.kind(), "{}", err);
        } else {
            tracing::warn!(kind = err.kind(), "{}", err);
        }
    }
}

/// Reporter that keeps every error in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    errors: Mutex<Vec<(&'static str, String)>>,
}

impl CollectingReporter {
    /// Reported errors as `(kind, message)` pairs, in report order
    pub fn errors(&self) -> Vec<(&'static str, String)> {
        self.errors
            .lock()
            .map(|errors| errors.clone())
            .unwrap_or_default()
    }

    /// Number of reported errors of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.errors().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, err: &BenchError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push((err.kind(), err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;

    #[test]
    fn test_collecting_reporter_keeps_kinds() {
        let reporter = CollectingReporter::default();
        reporter.report(&BenchError::Operation("short upload".into()));
        reporter.report(&BenchError::Protocol {
            stage: "object upload",
            job: "job-7".into(),
            source: ClientError::Server("disk full".into()),
        });

        assert_eq!(reporter.count("operation"), 1);
        assert_eq!(reporter.count("protocol"), 1);
        assert_eq!(reporter.errors()[0].1, "short upload");
    }

    #[test]
    fn test_tracing_reporter_does_not_panic_without_subscriber() {
        TracingReporter.report(&BenchError::Operation("bulk job rejected".into()));
        TracingReporter.report(&BenchError::Worker {
            thread: 2,
            reason: "panicked".into(),
        });
    }
}
