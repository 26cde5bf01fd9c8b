//! Throughput stability detection
//!
//! Operation records are bucketed into fixed-width time segments by their end
//! time. Segment width is the configured duration divided by
//! [`AUTO_TERM_CHECK`], so the checked window spans the whole duration. The most
//! recent [`AUTO_TERM_SAMPLES`] closed segments are kept in a ring, and nothing
//! is judged before that many segments have closed.
//!
//! Each time a segment closes, the newest one is taken as the current speed and
//! the [`AUTO_TERM_CHECK`] - 1 segments before it must all lie within
//! `scale` of it. Bytes are compared when the current segment moved any bytes,
//! objects otherwise. An idle current segment is never stable.

use super::ops::Operation;
use super::{AUTO_TERM_CHECK, AUTO_TERM_SAMPLES};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// Auto-termination parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AutoTermConfig {
    /// Only records of this type are measured
    pub op_type: String,
    /// Time span that must show steady throughput
    pub duration: Duration,
    /// Allowed relative deviation from the current segment
    pub scale: f64,
}

/// Outcome of feeding one record to the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Collecting,
    Stable(Stability),
}

/// Throughput at the point stability was declared
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stability {
    /// Closed segments seen so far
    pub segments: u64,
    pub bytes_per_sec: f64,
    pub objects_per_sec: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Segment {
    index: u64,
    bytes: u64,
    objects: u64,
    ops: u64,
}

impl Segment {
    fn empty(index: u64) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    fn add(&mut self, op: &Operation) {
        self.bytes += op.size;
        self.objects += op.obj_per_op as u64;
        self.ops += 1;
    }
}

/// Streaming stability detector
#[derive(Debug)]
pub struct AutoTerminator {
    config: AutoTermConfig,
    width_nanos: u64,
    origin: Option<DateTime<Utc>>,
    ring: VecDeque<Segment>,
    current: Option<Segment>,
    closed: u64,
}

impl AutoTerminator {
    pub fn new(config: AutoTermConfig) -> Self {
        let width = config.duration / AUTO_TERM_CHECK as u32;
        Self {
            width_nanos: (width.as_nanos() as u64).max(1),
            config,
            origin: None,
            ring: VecDeque::with_capacity(AUTO_TERM_SAMPLES),
            current: None,
            closed: 0,
        }
    }

    /// Width of one segment
    pub fn segment_width(&self) -> Duration {
        Duration::from_nanos(self.width_nanos)
    }

    /// Account one record and re-evaluate if a segment closed
    ///
    /// Failed records and records of other types are ignored. Records that
    /// land in an already closed segment still count towards it.
    pub fn record(&mut self, op: &Operation) -> Verdict {
        if op.op_type != self.config.op_type || op.is_error() {
            return Verdict::Collecting;
        }

        let origin = *self.origin.get_or_insert(op.start);
        let elapsed = (op.end - origin).num_nanoseconds().unwrap_or(i64::MAX).max(0) as u64;
        let index = elapsed / self.width_nanos;

        let Some(current) = self.current.as_mut() else {
            let mut seg = Segment::empty(index);
            seg.add(op);
            self.current = Some(seg);
            return Verdict::Collecting;
        };

        if index == current.index {
            current.add(op);
            return Verdict::Collecting;
        }
        if index < current.index {
            if let Some(seg) = self.ring.iter_mut().find(|s| s.index == index) {
                seg.add(op);
            }
            return Verdict::Collecting;
        }

        let finished = *current;
        let mut next = Segment::empty(index);
        next.add(op);
        self.current = Some(next);

        self.close(finished);
        // Skipped segments had no completions
        let gap_start = (finished.index + 1).max(index.saturating_sub(AUTO_TERM_SAMPLES as u64));
        for idle in gap_start..index {
            self.close(Segment::empty(idle));
        }

        self.evaluate()
    }

    fn close(&mut self, seg: Segment) {
        if self.ring.len() == AUTO_TERM_SAMPLES {
            self.ring.pop_front();
        }
        self.ring.push_back(seg);
        self.closed += 1;
    }

    fn evaluate(&self) -> Verdict {
        if self.closed < AUTO_TERM_SAMPLES as u64 || self.ring.len() < AUTO_TERM_CHECK {
            return Verdict::Collecting;
        }

        let window: Vec<&Segment> = self.ring.iter().rev().take(AUTO_TERM_CHECK).collect();
        let latest = window[0];
        let metric: fn(&Segment) -> u64 = if latest.bytes > 0 {
            |s: &Segment| s.bytes
        } else {
            |s: &Segment| s.objects
        };

        let reference = metric(latest) as f64;
        if reference == 0.0 {
            return Verdict::Collecting;
        }
        let limit = reference * self.config.scale;
        let steady = window[1..]
            .iter()
            .all(|seg| (reference - metric(seg) as f64).abs() <= limit);
        if !steady {
            return Verdict::Collecting;
        }

        let secs = self.segment_width().as_secs_f64();
        Verdict::Stable(Stability {
            segments: self.closed,
            bytes_per_sec: latest.bytes as f64 / secs,
            objects_per_sec: latest.objects as f64 / secs,
        })
    }
}
