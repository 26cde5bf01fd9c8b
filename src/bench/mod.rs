//! Benchmark framework
//!
//! A benchmark is driven through a fixed sequence of phases by
//! [`lifecycle::run_benchmark`]:
//!
//! ```text
//! Created -> Prepared -> Running -> Completed | Cancelled -> Cleaned
//! ```
//!
//! Implementations provide the phase hooks through the [`Benchmark`] trait and
//! share their parameters through [`BenchmarkCommon`]. Workers block on a
//! [`StartSignal`] so every worker begins at the same moment, and send one
//! [`ops::Operation`] per completed cycle to a [`collector::Collector`].

pub mod autoterm;
pub mod bulkput;
pub mod collector;
pub mod lifecycle;
pub mod ops;
pub mod report;

use crate::client::{ClientFactory, PutOptions};
use crate::error::BenchError;
use crate::generator::GeneratorOptions;
use async_trait::async_trait;
use ops::Operations;
use report::{ErrorReporter, TracingReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Number of segments kept in the auto-termination window
pub const AUTO_TERM_SAMPLES: usize = 25;

/// Trailing segments that must agree before throughput counts as stable.
/// The newest of them is taken as the current speed.
pub const AUTO_TERM_CHECK: usize = 7;

/// Phase hooks of a benchmark
#[async_trait]
pub trait Benchmark: Send + Sync {
    /// Set up the environment; safe to call more than once
    async fn prepare(&self, cancel: &CancellationToken) -> Result<(), BenchError>;

    /// Spawn the workers, wait for them to stop, and return every operation
    ///
    /// Workers wait for `start` before their first cycle and stop at the top of
    /// a cycle once `cancel` fires.
    async fn start(
        &self,
        cancel: CancellationToken,
        start: StartSignal,
    ) -> Result<Operations, BenchError>;

    /// Best-effort teardown; failures are logged, never returned
    async fn cleanup(&self, cancel: &CancellationToken);

    fn common(&self) -> &BenchmarkCommon;
}

/// Parameters shared by every benchmark kind
#[derive(Clone)]
pub struct BenchmarkCommon {
    pub client: Arc<dyn ClientFactory>,
    /// Number of workers
    pub concurrency: usize,
    /// Options for each worker's object generator
    pub source: GeneratorOptions,
    pub bucket: String,
    /// Endpoint label written to every operation record
    pub endpoint: String,
    /// Running as one of several coordinated clients; reported in the start log
    pub client_mode: bool,
    /// Empty the bucket before the run and delete uploads afterwards
    pub clear: bool,
    /// Destination has versioning enabled. Only reported in the start log, as
    /// removing old versions on cleanup is the storage client's job.
    pub versioned: bool,
    /// Receives preparation progress in `[0, 1]`
    pub prepare_progress: Option<mpsc::Sender<f64>>,
    /// Auto-termination is enabled when this is non-zero
    pub auto_term_dur: Duration,
    pub auto_term_scale: f64,
    pub put_opts: PutOptions,
    pub reporter: Arc<dyn ErrorReporter>,
    /// Index of this client when several run together, 0 otherwise
    ///
    /// Worker seeds are offset by `client_idx * concurrency`, so clients sharing
    /// a seed never declare the same object names.
    pub client_idx: usize,
}

impl BenchmarkCommon {
    pub fn new(client: Arc<dyn ClientFactory>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            concurrency: 20,
            source: GeneratorOptions::default(),
            bucket: bucket.into(),
            endpoint: String::new(),
            client_mode: false,
            clear: true,
            versioned: false,
            prepare_progress: None,
            auto_term_dur: Duration::ZERO,
            auto_term_scale: 0.075,
            put_opts: PutOptions::default(),
            reporter: Arc::new(TracingReporter),
            client_idx: 0,
        }
    }

    /// Create the bucket empty, or delete its contents if it exists
    ///
    /// When `clear` is off an existing bucket is left alone. If creation fails
    /// the bucket is checked again, since another client may have created it in
    /// the meantime; only a bucket that still does not exist is an error.
    pub async fn create_empty_bucket(&self) -> Result<(), BenchError> {
        let client = self.client.acquire();
        let setup = |source| BenchError::Setup {
            bucket: self.bucket.clone(),
            source,
        };

        if !self.clear && client.bucket_exists(&self.bucket).await.map_err(setup)? {
            tracing::info!(bucket = %self.bucket, "Using existing bucket");
            return Ok(());
        }

        tracing::info!(bucket = %self.bucket, "Creating empty bucket");
        if let Err(err) = client.ensure_empty_bucket(&self.bucket).await {
            match client.bucket_exists(&self.bucket).await {
                Ok(true) => {
                    tracing::debug!(bucket = %self.bucket, error = %err, "Bucket created concurrently");
                }
                _ => return Err(setup(err)),
            }
        }
        Ok(())
    }

    /// Delete everything in the bucket when `clear` is set
    pub async fn delete_all_in_bucket(&self) {
        if !self.clear {
            return;
        }
        let client = self.client.acquire();
        match client.delete_all_objects(&self.bucket).await {
            Ok(removed) => tracing::info!(bucket = %self.bucket, removed, "Bucket cleaned"),
            Err(err) => tracing::warn!(bucket = %self.bucket, error = %err, "Cleanup failed"),
        }
    }

    /// Publish preparation progress, clamped to `[0, 1]`
    ///
    /// Dropped if nobody listens or the channel is full.
    pub fn prepare_progress(&self, progress: f64) {
        if let Some(tx) = &self.prepare_progress {
            let _ = tx.try_send(progress.clamp(0.0, 1.0));
        }
    }
}

impl std::fmt::Debug for BenchmarkCommon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkCommon")
            .field("concurrency", &self.concurrency)
            .field("source", &self.source)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("client_mode", &self.client_mode)
            .field("clear", &self.clear)
            .field("versioned", &self.versioned)
            .field("auto_term_dur", &self.auto_term_dur)
            .field("auto_term_scale", &self.auto_term_scale)
            .field("client_idx", &self.client_idx)
            .finish_non_exhaustive()
    }
}

/// Create a linked start trigger and signal
pub fn start_signal() -> (StartTrigger, StartSignal) {
    let (tx, rx) = watch::channel(false);
    (StartTrigger(tx), StartSignal(rx))
}

/// Releases every [`StartSignal`] cloned from the same pair
#[derive(Debug)]
pub struct StartTrigger(watch::Sender<bool>);

impl StartTrigger {
    pub fn release(&self) {
        self.0.send_replace(true);
    }
}

/// Barrier that workers wait on before their first cycle
#[derive(Debug, Clone)]
pub struct StartSignal(watch::Receiver<bool>);

impl StartSignal {
    /// Wait until released; `false` if the trigger was dropped first
    pub async fn wait(&mut self) -> bool {
        self.0.wait_for(|released| *released).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::InMemoryStore;
    use crate::client::{SharedClient, StorageClient};

    fn common_with(store: Arc<InMemoryStore>) -> BenchmarkCommon {
        BenchmarkCommon::new(Arc::new(SharedClient::new(store)), "bench")
    }

    #[tokio::test]
    async fn test_create_empty_bucket_clears_existing() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        let common = common_with(Arc::clone(&store));

        common.create_empty_bucket().await.unwrap();
        assert!(store.bucket_exists("bench").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_tolerates_concurrent_creation() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        store.set_fail_bucket_create(true);

        common_with(store).create_empty_bucket().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_fails_when_bucket_still_missing() {
        let store = Arc::new(InMemoryStore::default());
        store.set_fail_bucket_create(true);

        let err = common_with(store).create_empty_bucket().await.unwrap_err();
        assert_eq!(err.kind(), "setup");
    }

    #[tokio::test]
    async fn test_no_clear_keeps_existing_bucket() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        store.set_fail_bucket_create(true);
        let mut common = common_with(store);
        common.clear = false;

        common.create_empty_bucket().await.unwrap();
    }

    #[test]
    fn test_prepare_progress_clamps_and_drops() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut common = common_with(Arc::new(InMemoryStore::default()));
        common.prepare_progress(0.5);

        common.prepare_progress = Some(tx);
        common.prepare_progress(1.7);
        common.prepare_progress(0.2);

        assert_eq!(rx.try_recv().unwrap(), 1.0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_signal() {
        let (trigger, signal) = start_signal();
        let mut waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        trigger.release();
        assert!(handle.await.unwrap());

        let (trigger, mut signal) = start_signal();
        drop(trigger);
        assert!(!signal.wait().await);
    }
}
