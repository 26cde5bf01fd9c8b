//! Bulk upload benchmark
//!
//! Each worker repeats one job cycle until the run is cancelled:
//!
//! 1. Generate a batch of `bulk_num` objects and declare them as a bulk job
//! 2. Poll for chunks the server is ready to receive, backing off while it has
//!    no capacity
//! 3. Upload every byte range of every granted chunk
//! 4. Emit one `BULKPUT` operation covering the whole batch
//!
//! A rejected submission or a range that does not match the declared sizes is
//! recorded on the operation and the worker moves on. A failed poll or a failed
//! upload inside a granted chunk is a protocol error and stops the whole run.

use super::autoterm::AutoTermConfig;
use super::collector::{AutoTerm, Collector, OpSender};
use super::ops::{Operation, Operations};
use super::report::ErrorReporter;
use super::{Benchmark, BenchmarkCommon, StartSignal};
use crate::client::{ChunkObject, ClientFactory, JobId, ManifestEntry, PutOptions, StorageClient};
use crate::error::BenchError;
use crate::generator::{Source, SyntheticObject};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Operation type of bulk upload records
pub const BULK_PUT_OP: &str = "BULKPUT";

/// Wait between polls while the server offers no chunks
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Bulk upload benchmark
#[derive(Debug)]
pub struct BulkPut {
    common: BenchmarkCommon,
    bulk_num: usize,
    backoff: Duration,
}

impl BulkPut {
    /// Create the benchmark; `bulk_num` objects are declared per job
    pub fn new(common: BenchmarkCommon, bulk_num: usize) -> Result<Self, BenchError> {
        if bulk_num == 0 {
            return Err(BenchError::Config(
                "bulk batch size must be at least 1".to_string(),
            ));
        }
        if common.concurrency == 0 {
            return Err(BenchError::Config("concurrency must be at least 1".to_string()));
        }
        Ok(Self {
            common,
            bulk_num,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Override the backoff between empty polls
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn bulk_num(&self) -> usize {
        self.bulk_num
    }

    fn worker(&self, thread: u16, source: Box<dyn Source>) -> BulkWorker {
        let mut put_opts = self.common.put_opts.clone();
        if put_opts.content_type.is_none() {
            put_opts.content_type = Some(crate::generator::OBJECT_CONTENT_TYPE.to_string());
        }
        BulkWorker {
            thread,
            bulk_num: self.bulk_num,
            backoff: self.backoff,
            bucket: self.common.bucket.clone(),
            endpoint: self.common.endpoint.clone(),
            put_opts,
            clients: Arc::clone(&self.common.client),
            reporter: Arc::clone(&self.common.reporter),
            source,
        }
    }

    /// One source per worker
    ///
    /// Seeds are offset by the worker's index across all clients, so clients
    /// sharing a seed still declare distinct object names.
    fn sources(&self) -> Result<Vec<Box<dyn Source>>, BenchError> {
        let base = self.common.client_idx * self.common.concurrency;
        (0..self.common.concurrency)
            .map(|thread| self.common.source.for_worker(base + thread).new_source())
            .collect::<crate::Result<Vec<_>>>()
            .map_err(BenchError::config)
    }

    fn auto_term(&self, run: &CancellationToken) -> Option<AutoTerm> {
        if self.common.auto_term_dur.is_zero() {
            return None;
        }
        Some(AutoTerm {
            config: AutoTermConfig {
                op_type: BULK_PUT_OP.to_string(),
                duration: self.common.auto_term_dur,
                scale: self.common.auto_term_scale,
            },
            cancel: run.clone(),
        })
    }
}

#[async_trait]
impl Benchmark for BulkPut {
    async fn prepare(&self, cancel: &CancellationToken) -> Result<(), BenchError> {
        if cancel.is_cancelled() {
            return Err(BenchError::Cancelled("prepare"));
        }
        self.common.prepare_progress(0.0);
        tokio::select! {
            res = self.common.create_empty_bucket() => res?,
            _ = cancel.cancelled() => {
                tracing::debug!(bucket = %self.common.bucket, "Prepare cancelled");
                return Err(BenchError::Cancelled("prepare"));
            }
        }
        self.common.prepare_progress(1.0);
        Ok(())
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        start: StartSignal,
    ) -> Result<Operations, BenchError> {
        let sources = self.sources()?;

        // Auto-termination and fatal errors stop this run without touching the caller's token
        let run = cancel.child_token();
        let collector = Collector::spawn(self.auto_term(&run));

        if let Some(source) = sources.first() {
            tracing::info!(
                concurrency = self.common.concurrency,
                bulk_num = self.bulk_num,
                bucket = %self.common.bucket,
                client_idx = self.common.client_idx,
                client_mode = self.common.client_mode,
                versioned = self.common.versioned,
                "Starting bulk put: {}",
                source
            );
        }

        // Dropping the set aborts every worker
        let mut workers = JoinSet::new();
        let mut threads = HashMap::with_capacity(sources.len());
        for (thread, source) in sources.into_iter().enumerate() {
            let thread = thread as u16;
            let worker = self.worker(thread, source);
            let handle = workers.spawn(worker.run(run.clone(), start.clone(), collector.sender()));
            threads.insert(handle.id(), thread);
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next_with_id().await {
            let err = match joined {
                Ok((_, Ok(()))) => continue,
                Ok((_, Err(err))) => err,
                Err(join) => BenchError::Worker {
                    thread: threads.get(&join.id()).copied().unwrap_or(u16::MAX),
                    reason: join.to_string(),
                },
            };
            self.common.reporter.report(&err);
            run.cancel();
            first_error.get_or_insert(err);
        }

        let ops = collector.close().await;
        match first_error {
            Some(err) => Err(err),
            None => Ok(ops),
        }
    }

    async fn cleanup(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = self.common.delete_all_in_bucket() => {}
            _ = cancel.cancelled() => {
                tracing::debug!(bucket = %self.common.bucket, "Cleanup cancelled");
            }
        }
    }

    fn common(&self) -> &BenchmarkCommon {
        &self.common
    }
}

/// Objects of one job cycle
struct Batch {
    objects: HashMap<String, SyntheticObject>,
    manifest: Vec<ManifestEntry>,
}

impl Batch {
    /// All objects of a batch share one generated block
    fn generate(source: &mut dyn Source, count: usize) -> Self {
        let generated = source.batch(count);
        let mut objects = HashMap::with_capacity(count);
        let mut manifest = Vec::with_capacity(count);
        for obj in generated {
            manifest.push(ManifestEntry {
                name: obj.name.clone(),
                size: obj.size,
            });
            objects.insert(obj.name.clone(), obj);
        }
        Self { objects, manifest }
    }

    fn total_size(&self) -> u64 {
        self.manifest.iter().map(|e| e.size).sum()
    }
}

/// One benchmark worker and everything it owns
struct BulkWorker {
    thread: u16,
    bulk_num: usize,
    backoff: Duration,
    bucket: String,
    endpoint: String,
    put_opts: PutOptions,
    clients: Arc<dyn ClientFactory>,
    reporter: Arc<dyn ErrorReporter>,
    source: Box<dyn Source>,
}

impl BulkWorker {
    async fn run(
        mut self,
        cancel: CancellationToken,
        mut start: StartSignal,
        ops: OpSender,
    ) -> Result<(), BenchError> {
        tokio::select! {
            released = start.wait() => {
                if !released {
                    return Ok(());
                }
            }
            _ = cancel.cancelled() => return Ok(()),
        }

        while !cancel.is_cancelled() {
            let op = self.bulk_put().await?;
            if ops.send(op).await.is_err() {
                break;
            }
        }
        tracing::debug!(thread = self.thread, "Worker stopped");
        Ok(())
    }

    /// Run one job cycle
    ///
    /// Per-operation failures end up on the returned record; only fatal
    /// errors are returned.
    async fn bulk_put(&mut self) -> Result<Operation, BenchError> {
        let batch = Batch::generate(self.source.as_mut(), self.bulk_num);
        let lease = self.clients.acquire();
        let client: &dyn StorageClient = &*lease;

        let start = Utc::now();
        let outcome = self.transfer(client, &batch).await;
        let end = Utc::now();

        let mut op = Operation {
            op_type: BULK_PUT_OP.to_string(),
            thread: self.thread,
            size: batch.total_size(),
            obj_per_op: batch.manifest.len(),
            endpoint: self.endpoint.clone(),
            start,
            end,
            name: batch.manifest[0].name.clone(),
            error: None,
        };

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                self.reporter.report(&err);
                op.error = Some(err.to_string());
            }
        }
        Ok(op)
    }

    async fn transfer(&self, client: &dyn StorageClient, batch: &Batch) -> Result<(), BenchError> {
        let job = client
            .submit_bulk_job(&self.bucket, &batch.manifest, &self.put_opts)
            .await
            .map_err(|e| BenchError::Operation(format!("put bulk error: {}", e)))?;

        let mut acknowledged = 0;
        while acknowledged < job.total_chunks {
            let chunks = client
                .poll_ready_chunks(&job.job_id)
                .await
                .map_err(|source| BenchError::Protocol {
                    stage: "chunk poll",
                    job: job.job_id.to_string(),
                    source,
                })?;

            if chunks.is_empty() {
                tracing::debug!(
                    thread = self.thread,
                    job = %job.job_id,
                    backoff = ?self.backoff,
                    "No chunks ready, backing off"
                );
                tokio::time::sleep(self.backoff).await;
                continue;
            }

            for chunk in &chunks {
                for part in &chunk.objects {
                    self.upload_range(client, batch, &job.job_id, part).await?;
                }
                acknowledged += 1;
            }
        }
        Ok(())
    }

    async fn upload_range(
        &self,
        client: &dyn StorageClient,
        batch: &Batch,
        job: &JobId,
        part: &ChunkObject,
    ) -> Result<(), BenchError> {
        let obj = batch.objects.get(&part.name).ok_or_else(|| {
            BenchError::Operation(format!("server requested undeclared object {:?}", part.name))
        })?;

        let fits = part
            .offset
            .checked_add(part.length)
            .is_some_and(|end| end <= obj.size);
        if !fits {
            return Err(BenchError::Operation(format!(
                "size mismatch for {}: server requested {} bytes at offset {}, declared {}",
                part.name, part.length, part.offset, obj.size
            )));
        }

        let body = obj
            .reader_at(part.offset)
            .map_err(|e| BenchError::Operation(e.to_string()))?
            .take(part.length);

        let sent = client
            .upload_object(&self.bucket, &part.name, body, job, part.offset)
            .await
            .map_err(|source| BenchError::Protocol {
                stage: "object upload",
                job: job.to_string(),
                source,
            })?;

        if sent != part.length {
            return Err(BenchError::Operation(format!(
                "short upload of {}: want {}, got {}",
                part.name, part.length, sent
            )));
        }

        tracing::trace!(
            thread = self.thread,
            name = %part.name,
            offset = part.offset,
            length = part.length,
            "Sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::report::CollectingReporter;
    use crate::bench::start_signal;
    use crate::client::memory::{InMemoryStore, SimulationConfig};
    use crate::client::{BulkJob, Chunk, ChunkBody, ClientError, SharedClient};
    use crate::generator::pattern::PatternOptions;
    use crate::generator::GeneratorOptions;

    fn common(store: Arc<dyn StorageClient>, reporter: Arc<CollectingReporter>) -> BenchmarkCommon {
        let mut common = BenchmarkCommon::new(Arc::new(SharedClient::new(store)), "bench");
        common.concurrency = 2;
        common.endpoint = "local".to_string();
        common.source = GeneratorOptions::default()
            .size(3000)
            .pattern(PatternOptions::default().block_size(8192).seed(11));
        common.reporter = reporter;
        common
    }

    fn bench_with(store: Arc<InMemoryStore>, bulk_num: usize) -> (BulkPut, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        let bench = BulkPut::new(common(store, Arc::clone(&reporter)), bulk_num).unwrap();
        (bench, reporter)
    }

    fn single_worker(bench: &BulkPut) -> BulkWorker {
        let source = bench.common.source.new_source().unwrap();
        bench.worker(0, source)
    }

    #[test]
    fn test_zero_batch_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let reporter = Arc::new(CollectingReporter::default());
        let err = BulkPut::new(common(store, reporter), 0).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_batch_names_unique() {
        let opts = GeneratorOptions::default().size(10);
        let mut source = opts.new_source().unwrap();
        let batch = Batch::generate(source.as_mut(), 50);
        assert_eq!(batch.objects.len(), 50);
        assert_eq!(batch.manifest.len(), 50);
        assert_eq!(batch.total_size(), 500);
    }

    #[test]
    fn test_large_batch_holds_one_block() {
        let opts = GeneratorOptions::default()
            .size(1024 * 1024)
            .pattern(PatternOptions::default().block_size(1024 * 1024).seed(2));
        let mut source = opts.new_source().unwrap();
        let batch = Batch::generate(source.as_mut(), 100);

        let blocks: std::collections::HashSet<usize> = batch
            .objects
            .values()
            .map(|obj| obj.data.backing().as_ptr() as usize)
            .collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(batch.total_size(), 100 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_cycle_uploads_every_object() {
        let store = Arc::new(InMemoryStore::new(SimulationConfig {
            objects_per_chunk: 3,
            max_chunk_bytes: 1024,
            ..Default::default()
        }));
        store.create_bucket("bench");
        let (bench, reporter) = bench_with(Arc::clone(&store), 8);

        let op = single_worker(&bench).bulk_put().await.unwrap();

        assert!(op.error.is_none());
        assert_eq!(op.op_type, BULK_PUT_OP);
        assert_eq!(op.obj_per_op, 8);
        assert_eq!(op.size, 8 * 3000);
        assert_eq!(op.endpoint, "local");
        assert!(op.end >= op.start);

        let (_, manifest) = &store.manifests()[0];
        assert_eq!(op.name, manifest[0].name);
        assert_eq!(store.completed_jobs(), 1);
        assert_eq!(store.object_count("bench"), 8);
        // 3000 bytes in 1024-byte ranges
        assert_eq!(store.uploads().len(), 8 * 3);
        assert!(reporter.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_between_empty_polls() {
        let store = Arc::new(InMemoryStore::new(SimulationConfig {
            busy_polls: 2,
            ..Default::default()
        }));
        store.create_bucket("bench");
        let (bench, _) = bench_with(Arc::clone(&store), 4);
        let mut worker = single_worker(&bench);

        let started = tokio::time::Instant::now();
        let op = worker.bulk_put().await.unwrap();
        let elapsed = started.elapsed();

        assert!(op.error.is_none());
        assert_eq!(store.empty_polls(), 2);
        assert_eq!(store.completed_jobs(), 1);
        assert!(elapsed >= DEFAULT_BACKOFF * 2);
        assert!(elapsed < DEFAULT_BACKOFF * 3);
    }

    #[tokio::test]
    async fn test_rejected_submission_recorded_on_op() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        store.set_fail_submit(true);
        let (bench, reporter) = bench_with(Arc::clone(&store), 5);

        let op = single_worker(&bench).bulk_put().await.unwrap();

        let err = op.error.unwrap();
        assert!(err.starts_with("put bulk error"), "{}", err);
        assert_eq!(op.obj_per_op, 5);
        assert_eq!(reporter.count("operation"), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_is_fatal() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        store.set_fail_upload(true);
        let (bench, _) = bench_with(Arc::clone(&store), 5);

        let err = single_worker(&bench).bulk_put().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("object upload failed"));
    }

    #[tokio::test]
    async fn test_fatal_error_stops_run() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        store.set_fail_poll(true);
        let (bench, reporter) = bench_with(Arc::clone(&store), 5);

        let cancel = CancellationToken::new();
        let (trigger, signal) = start_signal();
        trigger.release();

        let err = bench.start(cancel.clone(), signal).await.unwrap_err();
        assert_eq!(err.kind(), "protocol");
        assert!(!cancel.is_cancelled());
        assert!(reporter.count("protocol") >= 1);
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let store = Arc::new(InMemoryStore::default());
        let (bench, reporter) = bench_with(Arc::clone(&store), 10);
        bench.prepare(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        let (trigger, signal) = start_signal();
        let stopper = {
            let cancel = cancel.clone();
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                while store.completed_jobs() < 6 {
                    tokio::task::yield_now().await;
                }
                cancel.cancel();
            })
        };
        trigger.release();

        let ops = bench.start(cancel, signal).await.unwrap();
        stopper.await.unwrap();

        assert_eq!(ops.len() as u64, store.completed_jobs());
        assert_eq!(ops.errors(), 0);
        assert!(ops.iter().all(|op| op.obj_per_op == 10 && op.size == 30_000));
        assert!(reporter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_workers_wait_for_start() {
        let store = Arc::new(InMemoryStore::default());
        store.create_bucket("bench");
        let (bench, _) = bench_with(Arc::clone(&store), 2);

        let cancel = CancellationToken::new();
        let (trigger, signal) = start_signal();
        cancel.cancel();

        let ops = bench.start(cancel, signal).await.unwrap();
        drop(trigger);
        assert!(ops.is_empty());
        assert!(store.manifests().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_cancelled_is_error() {
        let store = Arc::new(InMemoryStore::default());
        let (bench, _) = bench_with(Arc::clone(&store), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = bench.prepare(&cancel).await.unwrap_err();
        assert_eq!(err.kind(), "cancelled");
        assert!(!store.bucket_exists("bench").await.unwrap());
    }

    #[test]
    fn test_client_index_offsets_sources() {
        let store = Arc::new(InMemoryStore::default());
        let (first, _) = bench_with(Arc::clone(&store), 1);
        let (mut second, _) = bench_with(store, 1);
        second.common.client_idx = 1;

        let names = |bench: &BulkPut| -> Vec<String> {
            bench
                .sources()
                .unwrap()
                .into_iter()
                .map(|mut source| source.object().name)
                .collect()
        };
        let (a, b) = (names(&first), names(&second));
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|name| !b.contains(name)));

        // worker 0 of client 1 follows worker 1 of client 0
        let next = first.common.source.for_worker(2).new_source().unwrap().object().name;
        assert_eq!(b[0], next);
    }

    #[tokio::test]
    async fn test_dropped_start_stops_workers() {
        let store = Arc::new(InMemoryStore::new(SimulationConfig {
            upload_latency: Duration::from_millis(1),
            ..Default::default()
        }));
        store.create_bucket("bench");
        let (bench, _) = bench_with(Arc::clone(&store), 2);
        let bench = Arc::new(bench);

        let (trigger, signal) = start_signal();
        trigger.release();
        let running = {
            let bench = Arc::clone(&bench);
            tokio::spawn(async move { bench.start(CancellationToken::new(), signal).await })
        };
        while store.completed_jobs() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = store.manifests().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.manifests().len(), settled);
    }

    /// Server whose submission handler panics
    struct PanickingSubmit;

    #[async_trait]
    impl StorageClient for PanickingSubmit {
        async fn submit_bulk_job(
            &self,
            _bucket: &str,
            _manifest: &[ManifestEntry],
            _opts: &PutOptions,
        ) -> Result<BulkJob, ClientError> {
            panic!("submission handler crashed")
        }

        async fn poll_ready_chunks(&self, _job: &JobId) -> Result<Vec<Chunk>, ClientError> {
            Ok(Vec::new())
        }

        async fn upload_object(
            &self,
            _bucket: &str,
            _name: &str,
            _body: ChunkBody,
            _job: &JobId,
            _offset: u64,
        ) -> Result<u64, ClientError> {
            Ok(0)
        }

        async fn ensure_empty_bucket(&self, _bucket: &str) -> Result<(), ClientError> {
            Ok(())
        }

        async fn bucket_exists(&self, _bucket: &str) -> Result<bool, ClientError> {
            Ok(true)
        }

        async fn delete_all_objects(&self, _bucket: &str) -> Result<u64, ClientError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_panicked_worker_reports_its_thread() {
        let reporter = Arc::new(CollectingReporter::default());
        let bench = BulkPut::new(common(Arc::new(PanickingSubmit), Arc::clone(&reporter)), 3).unwrap();
        let (trigger, signal) = start_signal();
        trigger.release();

        let err = bench.start(CancellationToken::new(), signal).await.unwrap_err();
        match err {
            BenchError::Worker { thread, reason } => {
                assert!(thread < 2, "thread {}", thread);
                assert!(reason.contains("panicked"), "{}", reason);
            }
            other => panic!("expected worker error, got {:?}", other),
        }
        assert!(reporter.count("worker") >= 1);
    }

    /// Server that asks for one byte more than each object has
    struct OversizedChunks;

    #[async_trait]
    impl StorageClient for OversizedChunks {
        async fn submit_bulk_job(
            &self,
            _bucket: &str,
            manifest: &[ManifestEntry],
            _opts: &PutOptions,
        ) -> Result<BulkJob, ClientError> {
            assert!(!manifest.is_empty());
            Ok(BulkJob {
                job_id: JobId("job-1".to_string()),
                total_chunks: 1,
            })
        }

        async fn poll_ready_chunks(&self, _job: &JobId) -> Result<Vec<Chunk>, ClientError> {
            Ok(vec![Chunk {
                objects: vec![ChunkObject {
                    name: self.name(),
                    offset: 0,
                    length: 3001,
                }],
            }])
        }

        async fn upload_object(
            &self,
            _bucket: &str,
            _name: &str,
            _body: ChunkBody,
            _job: &JobId,
            _offset: u64,
        ) -> Result<u64, ClientError> {
            Err(ClientError::Server("unexpected upload".to_string()))
        }

        async fn ensure_empty_bucket(&self, _bucket: &str) -> Result<(), ClientError> {
            Ok(())
        }

        async fn bucket_exists(&self, _bucket: &str) -> Result<bool, ClientError> {
            Ok(true)
        }

        async fn delete_all_objects(&self, _bucket: &str) -> Result<u64, ClientError> {
            Ok(0)
        }
    }

    impl OversizedChunks {
        fn name(&self) -> String {
            // first object name of a seeded source matches the worker's
            let opts = GeneratorOptions::default()
                .size(3000)
                .pattern(PatternOptions::default().block_size(8192).seed(11));
            opts.new_source().unwrap().object().name
        }
    }

    #[tokio::test]
    async fn test_size_mismatch_is_operation_error() {
        let reporter = Arc::new(CollectingReporter::default());
        let bench = BulkPut::new(common(Arc::new(OversizedChunks), Arc::clone(&reporter)), 1).unwrap();

        let op = single_worker(&bench).bulk_put().await.unwrap();

        let err = op.error.unwrap();
        assert!(err.starts_with("size mismatch"), "{}", err);
        assert_eq!(reporter.count("operation"), 1);
    }
}
