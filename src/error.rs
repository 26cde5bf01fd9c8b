//! Benchmark error taxonomy
//!
//! Errors are split by how far they reach:
//!
//! - **Config**: rejected before any worker starts
//! - **Setup**: bucket preparation failed, the run is aborted
//! - **Operation**: recorded on one operation record, the worker carries on
//! - **Protocol**: the chunk negotiation broke down, the whole run is stopped
//! - **Cancelled**: the caller stopped the benchmark before its run began
//!
//! Only protocol errors (and crashed workers) are fatal. Everything else is
//! either reported before the run or ends up in the result set's error rate.

use crate::client::ClientError;
use thiserror::Error;

/// Error raised by a benchmark phase or worker
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid parameters, detected before the run
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Environment setup failed
    #[error("setup failed for bucket {bucket:?}: {source}")]
    Setup {
        bucket: String,
        #[source]
        source: ClientError,
    },

    /// A single operation failed; recorded on its record
    #[error("{0}")]
    Operation(String),

    /// The server broke the chunk protocol or an upload inside a granted chunk failed
    #[error("{stage} failed for job {job}: {source}")]
    Protocol {
        stage: &'static str,
        job: String,
        #[source]
        source: ClientError,
    },

    /// A worker task panicked or was aborted
    #[error("worker {thread} terminated abnormally: {reason}")]
    Worker { thread: u16, reason: String },

    /// Cancellation arrived during the named phase
    #[error("cancelled during {0}")]
    Cancelled(&'static str),
}

impl BenchError {
    /// Wrap any displayable error as a configuration error
    pub fn config(err: impl std::fmt::Display) -> Self {
        Self::Config(format!("{:#}", err))
    }

    /// Stable label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Setup { .. } => "setup",
            Self::Operation(_) => "operation",
            Self::Protocol { .. } => "protocol",
            Self::Worker { .. } => "worker",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Whether the error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Worker { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_fatality() {
        let op = BenchError::Operation("short upload".into());
        assert_eq!(op.kind(), "operation");
        assert!(!op.is_fatal());

        let protocol = BenchError::Protocol {
            stage: "chunk poll",
            job: "job-1".into(),
            source: ClientError::Transport("connection reset".into()),
        };
        assert_eq!(protocol.kind(), "protocol");
        assert!(protocol.is_fatal());
        assert_eq!(
            protocol.to_string(),
            "chunk poll failed for job job-1: transport error: connection reset"
        );

        let config = BenchError::config(anyhow::anyhow!("bulk.objects must be positive"));
        assert_eq!(config.kind(), "config");
        assert!(!config.is_fatal());

        let cancelled = BenchError::Cancelled("prepare");
        assert_eq!(cancelled.kind(), "cancelled");
        assert!(!cancelled.is_fatal());
        assert_eq!(cancelled.to_string(), "cancelled during prepare");
    }
}
