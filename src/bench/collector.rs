//! Operation fan-in
//!
//! Workers send records through cloned [`OpSender`]s. A single task owns the
//! result set and, when auto-termination is enabled, the stability detector:
//!
//! ```text
//! Collecting --stable--> Stable --all senders gone--> Closed
//!      \______________all senders gone_______________/
//! ```
//!
//! Reaching `Stable` cancels the run token once. Records keep being collected
//! until every sender is dropped.

use super::autoterm::{AutoTermConfig, AutoTerminator, Verdict};
use super::ops::{Operation, Operations};
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle used by workers to hand over records
pub type OpSender = mpsc::Sender<Operation>;

/// Auto-termination wiring for a collector
#[derive(Debug, Clone)]
pub struct AutoTerm {
    pub config: AutoTermConfig,
    /// Cancelled once throughput is stable
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectorState {
    Collecting,
    Stable,
    Closed,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collecting => "collecting",
            Self::Stable => "stable",
            Self::Closed => "closed",
        })
    }
}

/// Gathers operation records from every worker
#[derive(Debug)]
pub struct Collector {
    tx: OpSender,
    handle: JoinHandle<Operations>,
}

impl Collector {
    /// Start the collecting task
    pub fn spawn(auto_term: Option<AutoTerm>) -> Self {
        // capacity 1: a send completes only once the previous record was taken
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(collect(rx, auto_term));
        Self { tx, handle }
    }

    /// A new sender for one worker
    pub fn sender(&self) -> OpSender {
        self.tx.clone()
    }

    /// Wait for every sender to drop and return the records
    ///
    /// Senders still held by workers keep the collector open, so call this
    /// after the workers have finished.
    pub async fn close(self) -> Operations {
        drop(self.tx);
        match self.handle.await {
            Ok(ops) => ops,
            Err(err) => {
                tracing::warn!(error = %err, "Collector task failed, results lost");
                Operations::default()
            }
        }
    }
}

async fn collect(mut rx: mpsc::Receiver<Operation>, auto_term: Option<AutoTerm>) -> Operations {
    let mut ops = Operations::default();
    let mut state = CollectorState::Collecting;
    let mut detector = auto_term.map(|a| (AutoTerminator::new(a.config), a.cancel));

    while let Some(op) = rx.recv().await {
        if let (CollectorState::Collecting, Some((term, cancel))) = (state, detector.as_mut()) {
            if let Verdict::Stable(s) = term.record(&op) {
                state = CollectorState::Stable;
                tracing::info!(
                    %state,
                    segments = s.segments,
                    bytes_per_sec = s.bytes_per_sec,
                    objects_per_sec = s.objects_per_sec,
                    "Throughput stable, stopping run"
                );
                cancel.cancel();
            }
        }
        ops.push(op);
    }

    state = CollectorState::Closed;
    tracing::debug!(%state, operations = ops.len(), "Collector finished");
    ops
}
