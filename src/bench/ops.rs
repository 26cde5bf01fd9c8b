//! Operation records and result-set analysis
//!
//! Every completed job cycle produces one [`Operation`]. The collector gathers
//! them into an [`Operations`] set, which carries the analysis used for the run
//! summary: totals, error rate, active time range, throughput and latency.

use crate::stats::histogram::LatencyHistogram;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One timed benchmark operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation type label, e.g. `BULKPUT`
    pub op_type: String,
    /// Worker index that executed the operation
    pub thread: u16,
    /// Total bytes covered by the operation
    pub size: u64,
    /// Objects covered by the operation
    pub obj_per_op: usize,
    /// Endpoint label the operation ran against
    pub endpoint: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Representative object name (the first of the batch)
    pub name: String,
    /// Error message, if the operation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Operation {
    /// Wall time between start and end, zero if the clock went backwards
    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A set of operation records
///
/// Records arrive from the collector in no particular order; call
/// [`sort_by_start_time`](Self::sort_by_start_time) before anything that
/// depends on ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operations(Vec<Operation>);

impl Operations {
    pub fn new(ops: Vec<Operation>) -> Self {
        Self(ops)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn push(&mut self, op: Operation) {
        self.0.push(op);
    }

    /// Append all records from another set
    pub fn merge(&mut self, other: Operations) {
        self.0.extend(other.0);
    }

    pub fn sort_by_start_time(&mut self) {
        self.0.sort_by_key(|op| op.start);
    }

    /// Records of the given operation type
    pub fn filter_by_op(&self, op_type: &str) -> Operations {
        self.0
            .iter()
            .filter(|op| op.op_type == op_type)
            .cloned()
            .collect()
    }

    /// Number of records carrying an error
    pub fn errors(&self) -> usize {
        self.0.iter().filter(|op| op.is_error()).count()
    }

    /// Fraction of records carrying an error, 0 for an empty set
    pub fn error_rate(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.errors() as f64 / self.0.len() as f64
    }

    /// Bytes moved by successful operations
    pub fn total_bytes(&self) -> u64 {
        self.successful().map(|op| op.size).sum()
    }

    /// Objects moved by successful operations
    pub fn total_objects(&self) -> u64 {
        self.successful().map(|op| op.obj_per_op as u64).sum()
    }

    fn successful(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| !op.is_error())
    }

    /// Window during which every worker was active
    ///
    /// Starts at the latest first-start over all threads and ends at the
    /// earliest last-end, so warm-up and wind-down are excluded. `None` if the
    /// set is empty or the workers never overlapped.
    pub fn active_time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut per_thread: HashMap<u16, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
        for op in &self.0 {
            per_thread
                .entry(op.thread)
                .and_modify(|(first, last)| {
                    *first = (*first).min(op.start);
                    *last = (*last).max(op.end);
                })
                .or_insert((op.start, op.end));
        }

        let start = per_thread.values().map(|(first, _)| *first).max()?;
        let end = per_thread.values().map(|(_, last)| *last).min()?;
        (end > start).then_some((start, end))
    }

    /// Throughput over the active time range
    ///
    /// Only operations fully inside the window are counted.
    pub fn throughput(&self) -> Throughput {
        let Some((start, end)) = self.active_time_range() else {
            return Throughput::default();
        };
        let window = (end - start).to_std().unwrap_or_default();

        let mut t = Throughput {
            duration: window,
            ..Default::default()
        };
        for op in self.successful() {
            if op.start >= start && op.end <= end {
                t.operations += 1;
                t.bytes += op.size;
                t.objects += op.obj_per_op as u64;
            }
        }
        t
    }

    /// Latency distribution of successful operations
    pub fn latency_histogram(&self) -> LatencyHistogram {
        let mut hist = LatencyHistogram::new();
        for op in self.successful() {
            hist.record(op.duration());
        }
        hist
    }
}

impl FromIterator<Operation> for Operations {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Operations {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Operations {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Work completed over a time window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub operations: u64,
    pub bytes: u64,
    pub objects: u64,
    pub duration: Duration,
}

impl Throughput {
    pub fn bytes_per_sec(&self) -> f64 {
        crate::util::time::calculate_throughput(self.bytes, self.duration)
    }

    pub fn objects_per_sec(&self) -> f64 {
        crate::util::time::calculate_rate(self.objects, self.duration)
    }

    pub fn ops_per_sec(&self) -> f64 {
        crate::util::time::calculate_rate(self.operations, self.duration)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn op_at(thread: u16, start_ms: i64, end_ms: i64, size: u64) -> Operation {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Operation {
            op_type: "BULKPUT".to_string(),
            thread,
            size,
            obj_per_op: 10,
            endpoint: "local".to_string(),
            start: base + chrono::Duration::milliseconds(start_ms),
            end: base + chrono::Duration::milliseconds(end_ms),
            name: format!("t{}-{}", thread, start_ms),
            error: None,
        }
    }

    #[test]
    fn test_sort_and_filter() {
        let mut other = op_at(0, 5, 6, 1);
        other.op_type = "STAT".to_string();
        let mut ops = Operations::new(vec![op_at(0, 30, 40, 1), other, op_at(1, 10, 20, 1)]);

        ops.sort_by_start_time();
        let starts: Vec<_> = ops.iter().map(|o| o.name.clone()).collect();
        assert_eq!(starts, vec!["t0-5", "t1-10", "t0-30"]);

        let bulk = ops.filter_by_op("BULKPUT");
        assert_eq!(bulk.len(), 2);
    }

    #[test]
    fn test_errors_excluded_from_totals() {
        let mut failed = op_at(0, 0, 10, 500);
        failed.error = Some("bulk job rejected".to_string());
        let ops = Operations::new(vec![op_at(0, 10, 20, 100), failed, op_at(1, 0, 20, 100)]);

        assert_eq!(ops.errors(), 1);
        assert!((ops.error_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(ops.total_bytes(), 200);
        assert_eq!(ops.total_objects(), 20);
        assert_eq!(Operations::default().error_rate(), 0.0);
    }

    #[test]
    fn test_active_time_range() {
        // thread 0 runs 0..100, thread 1 runs 20..80
        let ops = Operations::new(vec![
            op_at(0, 0, 50, 1),
            op_at(0, 50, 100, 1),
            op_at(1, 20, 50, 1),
            op_at(1, 50, 80, 1),
        ]);

        let (start, end) = ops.active_time_range().unwrap();
        assert_eq!((end - start).num_milliseconds(), 60);
        assert_eq!(start, ops.iter().nth(2).unwrap().start);

        assert!(Operations::default().active_time_range().is_none());
    }

    #[test]
    fn test_throughput_counts_ops_inside_window() {
        let ops = Operations::new(vec![
            op_at(0, 0, 500, 1000),
            op_at(0, 500, 1000, 1000),
            op_at(0, 1000, 1500, 1000),
            op_at(1, 500, 1000, 1000),
        ]);

        // window is 500..1000
        let t = ops.throughput();
        assert_eq!(t.duration, Duration::from_millis(500));
        assert_eq!(t.operations, 2);
        assert_eq!(t.bytes, 2000);
        assert_eq!(t.bytes_per_sec(), 4000.0);
        assert_eq!(t.objects_per_sec(), 40.0);
    }

    #[test]
    fn test_latency_histogram() {
        let ops = Operations::new(vec![op_at(0, 0, 100, 1), op_at(0, 100, 300, 1)]);
        let hist = ops.latency_histogram();
        assert_eq!(hist.len(), 2);
        let max = hist.max().unwrap();
        assert!(max.as_millis() >= 199 && max.as_millis() <= 201);
    }

    #[test]
    fn test_json_uses_rfc3339() {
        let ops = Operations::new(vec![op_at(3, 0, 10, 42)]);
        let json = serde_json::to_string(&ops).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"start\":\"2024-01-01T00:00:00Z\""));
        assert!(!json.contains("\"error\""));

        let back: Operations = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ops);
    }
}
