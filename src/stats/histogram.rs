//! Latency histogram using HdrHistogram
//!
//! Operation latencies range from a few microseconds (an in-memory job) to
//! minutes (a large batch against a busy server), so the histogram covers 1 µs
//! to 1 hour with 3 significant digits.
//!
//! # Example
//!
//! ```
//! use bulkpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//! hist.record(Duration::from_millis(120));
//! hist.record(Duration::from_millis(180));
//!
//! let p50 = hist.percentile(50.0).unwrap();
//! assert!(p50 >= Duration::from_millis(119));
//! ```

use crate::Result;
use hdrhistogram::Histogram;
use std::time::Duration;

const LOWEST_MICROS: u64 = 1;
const HIGHEST_MICROS: u64 = 3_600_000_000;

/// Latency histogram with microsecond resolution
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram covering 1 µs to 1 hour
    pub fn new() -> Self {
        // Bounds are constants that satisfy hdrhistogram's requirements
        let histogram = Histogram::new_with_bounds(LOWEST_MICROS, HIGHEST_MICROS, 3)
            .expect("constant histogram bounds are valid");
        Self { histogram }
    }

    /// Record one latency, clamped into the tracked range
    ///
    /// # Arguments
    ///
    /// * `latency` - Wall time of one operation; sub-microsecond values count as 1 µs
    ///
    /// # Example
    ///
    /// ```
    /// use bulkpulse::stats::histogram::LatencyHistogram;
    /// use std::time::Duration;
    ///
    /// let mut hist = LatencyHistogram::new();
    /// hist.record(Duration::from_nanos(10));
    /// hist.record(Duration::from_millis(40));
    /// assert_eq!(hist.min(), Some(Duration::from_micros(1)));
    /// assert_eq!(hist.len(), 2);
    /// ```
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let micros = (latency.as_micros() as u64).clamp(LOWEST_MICROS, HIGHEST_MICROS);
        let _ = self.histogram.record(micros);
    }

    /// Latency at `percentile`
    ///
    /// # Arguments
    ///
    /// * `percentile` - The percentile to query (0.0 - 100.0)
    ///
    /// # Returns
    ///
    /// The latency at the given percentile, or `None` if nothing was recorded.
    ///
    /// # Example
    ///
    /// ```
    /// use bulkpulse::stats::histogram::LatencyHistogram;
    /// use std::time::Duration;
    ///
    /// let mut hist = LatencyHistogram::new();
    /// assert!(hist.percentile(99.0).is_none());
    ///
    /// for ms in 1..=100 {
    ///     hist.record(Duration::from_millis(ms));
    /// }
    /// let p90 = hist.percentile(90.0).unwrap();
    /// assert!(p90 >= Duration::from_millis(89) && p90 <= Duration::from_millis(91));
    /// ```
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        self.non_empty()
            .map(|h| Duration::from_micros(h.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_micros(h.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        self.non_empty().map(|h| Duration::from_micros(h.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        self.non_empty()
            .map(|h| Duration::from_secs_f64(h.mean() / 1_000_000.0))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Add every sample of `other` to this histogram
    ///
    /// Used to combine the records of several clients before summarizing.
    ///
    /// # Arguments
    ///
    /// * `other` - The histogram to merge into this one
    ///
    /// # Errors
    ///
    /// Returns an error if `other` holds values outside the tracked range.
    ///
    /// # Example
    ///
    /// ```
    /// use bulkpulse::stats::histogram::LatencyHistogram;
    /// use std::time::Duration;
    ///
    /// let mut first = LatencyHistogram::new();
    /// first.record(Duration::from_millis(5));
    /// let mut second = LatencyHistogram::new();
    /// second.record(Duration::from_millis(9));
    ///
    /// first.merge(&second).unwrap();
    /// assert_eq!(first.len(), 2);
    /// ```
    pub fn merge(&mut self, other: &LatencyHistogram) -> Result<()> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| anyhow::anyhow!("Failed to merge histograms: {}", e))
    }

    fn non_empty(&self) -> Option<&Histogram<u64>> {
        (!self.is_empty()).then_some(&self.histogram)
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
