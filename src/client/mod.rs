//! Storage client abstraction
//!
//! The harness treats the object store as an opaque RPC client. Anything that can
//! accept a bulk job, report which chunks it is ready to receive, and take ranged
//! object uploads can be benchmarked by implementing [`StorageClient`].
//!
//! # Bulk job protocol
//!
//! 1. `submit_bulk_job` declares every object name and size up front and returns
//!    a job id plus the number of chunks the server split the job into.
//! 2. `poll_ready_chunks` returns the chunks the server can accept right now. An
//!    empty answer means "no capacity, come back later".
//! 3. `upload_object` sends one byte range of one object inside a granted chunk.
//!
//! Clients are handed out by a [`ClientFactory`] as [`ClientLease`]s; dropping the
//! lease runs its release callback, so a client is returned on every exit path.

pub mod memory;

use crate::generator::circular::CircularReader;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

/// Byte range body passed to [`StorageClient::upload_object`]
pub type ChunkBody = tokio::io::Take<CircularReader>;

/// Name and size of one object declared in a bulk job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
}

/// Server-assigned bulk job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reply to a bulk job submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkJob {
    pub job_id: JobId,
    /// Number of chunks the server will grant before the job is complete
    pub total_chunks: usize,
}

/// One byte range of one object inside a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkObject {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// A transfer window granted by the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub objects: Vec<ChunkObject>,
}

/// Put options forwarded with each bulk job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PutOptions {
    /// Storage class requested for uploaded objects
    pub storage_class: Option<String>,
    /// Send a Content-MD5 header with every upload
    pub send_content_md5: bool,
    /// Content type override; the generator's type is used otherwise
    pub content_type: Option<String>,
}

/// Error returned by a storage client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("bucket {0:?} not found")]
    BucketNotFound(String),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Opaque object storage client
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Declare a bulk put job for the given objects
    async fn submit_bulk_job(
        &self,
        bucket: &str,
        manifest: &[ManifestEntry],
        opts: &PutOptions,
    ) -> Result<BulkJob, ClientError>;

    /// Chunks of `job` the server is ready to receive; empty when it has no capacity
    async fn poll_ready_chunks(&self, job: &JobId) -> Result<Vec<Chunk>, ClientError>;

    /// Upload one byte range of an object as part of `job`, returning bytes accepted
    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        body: ChunkBody,
        job: &JobId,
        offset: u64,
    ) -> Result<u64, ClientError>;

    /// Create the bucket, or delete everything in it if it already exists
    async fn ensure_empty_bucket(&self, bucket: &str) -> Result<(), ClientError>;

    /// Whether the bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ClientError>;

    /// Delete every object in the bucket, returning how many were removed
    async fn delete_all_objects(&self, bucket: &str) -> Result<u64, ClientError>;
}

/// A client handle plus the callback that returns it
///
/// The callback runs when the lease is dropped.
pub struct ClientLease {
    client: Arc<dyn StorageClient>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ClientLease {
    /// Lease `client`, running `release` when the lease is dropped
    pub fn new(client: Arc<dyn StorageClient>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            client,
            release: Some(Box::new(release)),
        }
    }

    /// Lease a client that needs no release
    pub fn unmanaged(client: Arc<dyn StorageClient>) -> Self {
        Self {
            client,
            release: None,
        }
    }
}

impl Deref for ClientLease {
    type Target = dyn StorageClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for ClientLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ClientLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientLease")
            .field("managed", &self.release.is_some())
            .finish()
    }
}

/// Hands out storage clients
///
/// Must be safe to call from every worker at once.
pub trait ClientFactory: Send + Sync {
    fn acquire(&self) -> ClientLease;
}

/// Factory that shares a single client between all workers
#[derive(Clone)]
pub struct SharedClient {
    client: Arc<dyn StorageClient>,
}

impl SharedClient {
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self { client }
    }
}

impl ClientFactory for SharedClient {
    fn acquire(&self) -> ClientLease {
        ClientLease::unmanaged(Arc::clone(&self.client))
    }
}
