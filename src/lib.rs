//! bulkpulse - bulk upload benchmark for object storage
//!
//! bulkpulse drives an object store through its bulk put protocol: each worker
//! declares a batch of synthetic objects as one job, waits for the server to
//! grant transfer chunks, and uploads the requested byte ranges. Every job
//! becomes one timed operation record.
//!
//! # Architecture
//!
//! - **Generator**: seeded, partly compressible payloads served from a reusable block
//! - **Client**: opaque storage client trait plus an in-memory simulated server
//! - **Bench**: phase driver, bulk put workers, operation collector, auto-termination
//! - **Stats**: throughput over the fully-active window, latency histograms
//! - **Output**: text summary and JSON operation export

pub mod bench;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod output;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use bench::bulkput::BulkPut;
pub use bench::lifecycle::{run_benchmark, Phase, RunOutcome};
pub use bench::ops::{Operation, Operations};
pub use bench::{Benchmark, BenchmarkCommon};
pub use config::BenchConfig;
pub use error::BenchError;

/// Result type used throughout bulkpulse
pub type Result<T> = anyhow::Result<T>;
