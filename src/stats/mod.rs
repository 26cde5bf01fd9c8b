//! Run statistics
//!
//! [`OpSummary`] condenses an operation set into the numbers printed at the end
//! of a run: counts, error rate, throughput over the window where every worker
//! was active, and latency percentiles.
//!
//! # Example
//!
//! ```
//! use bulkpulse::bench::ops::Operations;
//! use bulkpulse::stats::OpSummary;
//!
//! let summary = OpSummary::from_operations("BULKPUT", &Operations::default());
//! assert_eq!(summary.operations, 0);
//! assert!(summary.latency.is_none());
//! ```

pub mod histogram;

use crate::bench::ops::{Operations, Throughput};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Latency percentiles of successful operations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

/// Summary of one operation type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpSummary {
    pub op_type: String,
    pub operations: usize,
    pub errors: usize,
    pub error_rate: f64,
    /// Distinct workers that produced records
    pub threads: usize,
    pub total_bytes: u64,
    pub total_objects: u64,
    #[serde(skip)]
    pub throughput: Throughput,
    pub latency: Option<LatencySummary>,
}

impl OpSummary {
    /// Summarize the records of `op_type` in `ops`
    pub fn from_operations(op_type: &str, ops: &Operations) -> Self {
        let ops = ops.filter_by_op(op_type);
        let hist = ops.latency_histogram();

        let latency = match (hist.min(), hist.mean(), hist.max()) {
            (Some(min), Some(mean), Some(max)) => Some(LatencySummary {
                min,
                mean,
                p50: hist.percentile(50.0).unwrap_or(mean),
                p90: hist.percentile(90.0).unwrap_or(max),
                p99: hist.percentile(99.0).unwrap_or(max),
                max,
            }),
            _ => None,
        };

        Self {
            op_type: op_type.to_string(),
            operations: ops.len(),
            errors: ops.errors(),
            error_rate: ops.error_rate(),
            threads: ops.iter().map(|op| op.thread).collect::<HashSet<_>>().len(),
            total_bytes: ops.total_bytes(),
            total_objects: ops.total_objects(),
            throughput: ops.throughput(),
            latency,
        }
    }
}
