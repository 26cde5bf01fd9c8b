//! Benchmark phase driver

use super::ops::Operations;
use super::{start_signal, Benchmark};
use crate::error::BenchError;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Benchmark phases, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Prepared,
    Running,
    Completed,
    Cancelled,
    Cleaned,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Prepared => "prepared",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Cleaned => "cleaned",
        })
    }
}

/// Result of a finished run
#[derive(Debug)]
pub struct RunOutcome {
    /// `Completed` or `Cancelled`
    pub ended: Phase,
    pub operations: Operations,
    /// Time spent in the running phase
    pub elapsed: Duration,
}

fn enter(phase: Phase) -> Phase {
    tracing::info!(%phase, "Benchmark phase");
    phase
}

/// Drive a benchmark through every phase
///
/// The run ends when `cancel` fires, when `run_duration` elapses, or when the
/// benchmark stops by itself (auto-termination or a fatal error). A run that
/// ends because `cancel` fired is `Cancelled`; any other clean stop is
/// `Completed`. Cleanup always runs once the benchmark has started, even when
/// the run failed or was cancelled.
///
/// If `cancel` has fired by the time preparation returns, nothing is started
/// and no cleanup runs.
///
/// # Errors
///
/// Returns the setup error if preparation fails, [`BenchError::Cancelled`] if
/// the caller cancelled during preparation, or the fatal error that stopped the
/// run.
pub async fn run_benchmark(
    bench: &dyn Benchmark,
    cancel: &CancellationToken,
    run_duration: Option<Duration>,
) -> Result<RunOutcome, BenchError> {
    enter(Phase::Created);
    bench.prepare(cancel).await?;
    if cancel.is_cancelled() {
        tracing::info!("Cancelled before the run started");
        return Err(BenchError::Cancelled("prepare"));
    }
    enter(Phase::Prepared);

    let run = cancel.child_token();
    let timer = run_duration.map(|limit| {
        let run = run.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {
                    tracing::info!(?limit, "Run duration reached");
                    run.cancel();
                }
                _ = run.cancelled() => {}
            }
        })
    });

    enter(Phase::Running);
    let started = Instant::now();
    let (trigger, signal) = start_signal();
    let (result, ()) = tokio::join!(bench.start(run.clone(), signal), async {
        // Workers are spawned before start() first yields
        tokio::task::yield_now().await;
        trigger.release();
    });
    let elapsed = started.elapsed();

    run.cancel();
    if let Some(timer) = timer {
        let _ = timer.await;
    }

    let ended = match &result {
        Ok(_) if !cancel.is_cancelled() => enter(Phase::Completed),
        _ => enter(Phase::Cancelled),
    };

    // Cleanup must not be skipped because the caller cancelled
    bench.cleanup(&CancellationToken::new()).await;
    enter(Phase::Cleaned);

    let operations = result?;
    Ok(RunOutcome {
        ended,
        operations,
        elapsed,
    })
}
