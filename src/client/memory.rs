//! In-memory bulk job server
//!
//! [`InMemoryStore`] implements [`StorageClient`] without any network. It splits
//! each submitted job into chunks, grants them on poll, checks every ranged
//! upload against the chunk it belongs to, and records what happened so tests
//! can verify the client side of the protocol.
//!
//! # Features
//!
//! - Configurable chunk shape (objects per chunk, maximum bytes per range)
//! - Simulated backpressure: a number of empty polls per job before chunks appear
//! - Failure injection for submissions, polls, uploads and bucket creation
//! - Optional per-upload latency for realistic simulated runs
//!
//! # Example
//!
//! ```
//! use bulkpulse::client::memory::{InMemoryStore, SimulationConfig};
//! use bulkpulse::client::{ManifestEntry, PutOptions, StorageClient};
//!
//! # tokio_test_block_on(async {
//! let store = InMemoryStore::new(SimulationConfig { objects_per_chunk: 2, ..Default::default() });
//! store.ensure_empty_bucket("bench").await.unwrap();
//!
//! let manifest: Vec<_> = (0..5)
//!     .map(|i| ManifestEntry { name: format!("obj-{}", i), size: 100 })
//!     .collect();
//! let job = store.submit_bulk_job("bench", &manifest, &PutOptions::default()).await.unwrap();
//! assert_eq!(job.total_chunks, 3);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use super::{
    BulkJob, Chunk, ChunkBody, ChunkObject, ClientError, JobId, ManifestEntry, PutOptions,
    StorageClient,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shape and behavior of the simulated server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum object ranges per chunk
    pub objects_per_chunk: usize,
    /// Objects larger than this are split into ranges of at most this many bytes (0 = never split)
    pub max_chunk_bytes: u64,
    /// Empty polls answered for every job before its chunks become ready
    pub busy_polls: usize,
    /// Maximum chunks granted per poll (0 = all outstanding)
    pub max_ready_chunks: usize,
    /// Artificial delay added to every upload
    #[serde(rename = "upload_latency_ms", with = "duration_millis")]
    pub upload_latency: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            objects_per_chunk: 10,
            max_chunk_bytes: 0,
            busy_polls: 0,
            max_ready_chunks: 0,
            upload_latency: Duration::ZERO,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// One accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub job: JobId,
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug)]
struct ChunkState {
    objects: Vec<ChunkObject>,
    pending: HashSet<(String, u64)>,
}

impl ChunkState {
    fn new(objects: Vec<ChunkObject>) -> Self {
        let pending = objects.iter().map(|o| (o.name.clone(), o.offset)).collect();
        Self { objects, pending }
    }

    fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug)]
struct JobRecord {
    bucket: String,
    manifest: Vec<ManifestEntry>,
    chunks: Vec<ChunkState>,
    busy_polls_left: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    buckets: HashMap<String, HashMap<String, u64>>,
    jobs: HashMap<JobId, JobRecord>,
    next_job: u64,
    manifests: Vec<(JobId, Vec<ManifestEntry>)>,
    uploads: Vec<UploadRecord>,
    completed_jobs: u64,
    polls: u64,
    empty_polls: u64,
    fail_submit: bool,
    fail_poll: bool,
    fail_upload: bool,
    fail_bucket_create: bool,
}

/// Simulated bulk job server
#[derive(Debug, Default)]
pub struct InMemoryStore {
    config: SimulationConfig,
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Create a store with the given simulation settings
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a bucket directly, bypassing failure injection
    pub fn create_bucket(&self, bucket: &str) {
        self.state().buckets.entry(bucket.to_string()).or_default();
    }

    /// Fail every job submission with a server error
    pub fn set_fail_submit(&self, fail: bool) {
        self.state().fail_submit = fail;
    }

    /// Fail every chunk poll with a transport error
    pub fn set_fail_poll(&self, fail: bool) {
        self.state().fail_poll = fail;
    }

    /// Fail every upload with a transport error
    pub fn set_fail_upload(&self, fail: bool) {
        self.state().fail_upload = fail;
    }

    /// Fail bucket creation without creating anything
    pub fn set_fail_bucket_create(&self, fail: bool) {
        self.state().fail_bucket_create = fail;
    }

    /// Manifests of every submitted job, in submission order
    pub fn manifests(&self) -> Vec<(JobId, Vec<ManifestEntry>)> {
        self.state().manifests.clone()
    }

    /// Every accepted upload, in arrival order
    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.state().uploads.clone()
    }

    /// Jobs whose chunks were all received
    pub fn completed_jobs(&self) -> u64 {
        self.state().completed_jobs
    }

    /// Jobs submitted but not yet complete
    pub fn open_jobs(&self) -> usize {
        self.state().jobs.len()
    }

    /// Total chunk polls answered
    pub fn polls(&self) -> u64 {
        self.state().polls
    }

    /// Polls answered with no chunks
    pub fn empty_polls(&self) -> u64 {
        self.state().empty_polls
    }

    /// Number of objects stored in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.state().buckets.get(bucket).map_or(0, HashMap::len)
    }

    /// Split a manifest into chunks of object ranges
    fn plan_chunks(&self, manifest: &[ManifestEntry]) -> Vec<ChunkState> {
        let per_chunk = self.config.objects_per_chunk.max(1);
        let ranges = manifest.iter().flat_map(|entry| {
            let step = match self.config.max_chunk_bytes {
                0 => entry.size.max(1),
                max => max,
            };
            let count = entry.size.div_ceil(step).max(1);
            (0..count).map(move |i| {
                let offset = i * step;
                ChunkObject {
                    name: entry.name.clone(),
                    offset,
                    length: step.min(entry.size - offset),
                }
            })
        });

        let ranges: Vec<ChunkObject> = ranges.collect();
        ranges
            .chunks(per_chunk)
            .map(|objects| ChunkState::new(objects.to_vec()))
            .collect()
    }
}

#[async_trait]
impl StorageClient for InMemoryStore {
    async fn submit_bulk_job(
        &self,
        bucket: &str,
        manifest: &[ManifestEntry],
        _opts: &PutOptions,
    ) -> Result<BulkJob, ClientError> {
        let chunks = self.plan_chunks(manifest);
        let mut state = self.state();

        if state.fail_submit {
            return Err(ClientError::Server("bulk job rejected".to_string()));
        }
        if !state.buckets.contains_key(bucket) {
            return Err(ClientError::BucketNotFound(bucket.to_string()));
        }

        state.next_job += 1;
        let job_id = JobId(format!("job-{:08}", state.next_job));
        let total_chunks = chunks.len();

        state.manifests.push((job_id.clone(), manifest.to_vec()));
        state.jobs.insert(
            job_id.clone(),
            JobRecord {
                bucket: bucket.to_string(),
                manifest: manifest.to_vec(),
                chunks,
                busy_polls_left: self.config.busy_polls,
            },
        );

        Ok(BulkJob {
            job_id,
            total_chunks,
        })
    }

    async fn poll_ready_chunks(&self, job: &JobId) -> Result<Vec<Chunk>, ClientError> {
        let mut state = self.state();
        if state.fail_poll {
            return Err(ClientError::Transport("chunk poll connection reset".to_string()));
        }
        state.polls += 1;

        let record = state
            .jobs
            .get_mut(job)
            .ok_or_else(|| ClientError::JobNotFound(job.clone()))?;

        if record.busy_polls_left > 0 {
            record.busy_polls_left -= 1;
            state.empty_polls += 1;
            return Ok(Vec::new());
        }

        let limit = match self.config.max_ready_chunks {
            0 => usize::MAX,
            n => n,
        };
        let ready: Vec<Chunk> = record
            .chunks
            .iter()
            .filter(|c| !c.is_complete())
            .take(limit)
            .map(|c| Chunk {
                objects: c.objects.clone(),
            })
            .collect();

        if ready.is_empty() {
            state.empty_polls += 1;
        }
        Ok(ready)
    }

    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        mut body: ChunkBody,
        job: &JobId,
        offset: u64,
    ) -> Result<u64, ClientError> {
        if self.state().fail_upload {
            return Err(ClientError::Transport("upload connection reset".to_string()));
        }
        if !self.config.upload_latency.is_zero() {
            tokio::time::sleep(self.config.upload_latency).await;
        }

        let received = tokio::io::copy(&mut body, &mut tokio::io::sink())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let mut state = self.state();
        let record = state
            .jobs
            .get_mut(job)
            .ok_or_else(|| ClientError::JobNotFound(job.clone()))?;
        if record.bucket != bucket {
            return Err(ClientError::Server(format!(
                "job {} belongs to bucket {:?}, not {:?}",
                job, record.bucket, bucket
            )));
        }

        let key = (name.to_string(), offset);
        let chunk = record
            .chunks
            .iter_mut()
            .find(|c| c.pending.contains(&key))
            .ok_or_else(|| {
                ClientError::Server(format!("no pending range {} @ {} in job {}", name, offset, job))
            })?;
        let expected = chunk
            .objects
            .iter()
            .find(|o| o.name == name && o.offset == offset)
            .map_or(0, |o| o.length);
        if received != expected {
            return Err(ClientError::Server(format!(
                "range {} @ {} expected {} bytes, received {}",
                name, offset, expected, received
            )));
        }
        chunk.pending.remove(&key);

        let job_done = record.chunks.iter().all(ChunkState::is_complete);
        let stored: Vec<(String, u64)> = if job_done {
            record
                .manifest
                .iter()
                .map(|e| (e.name.clone(), e.size))
                .collect()
        } else {
            Vec::new()
        };

        state.uploads.push(UploadRecord {
            job: job.clone(),
            name: name.to_string(),
            offset,
            length: received,
        });

        if job_done {
            state.jobs.remove(job);
            state.completed_jobs += 1;
            state
                .buckets
                .entry(bucket.to_string())
                .or_default()
                .extend(stored);
        }

        Ok(received)
    }

    async fn ensure_empty_bucket(&self, bucket: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        if state.fail_bucket_create {
            return Err(ClientError::Server(format!("cannot create bucket {:?}", bucket)));
        }
        state.buckets.insert(bucket.to_string(), HashMap::new());
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError> {
        Ok(self.state().buckets.contains_key(bucket))
    }

    async fn delete_all_objects(&self, bucket: &str) -> Result<u64, ClientError> {
        let mut state = self.state();
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| ClientError::BucketNotFound(bucket.to_string()))?;
        let removed = objects.len() as u64;
        objects.clear();
        Ok(removed)
    }
}
