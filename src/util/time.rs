//! Rate and size formatting helpers
//!
//! Used by the run summary and by `Display` impls. Sizes use binary units
//! (KiB, MiB, ...) everywhere so they line up with the size strings accepted
//! in configuration.

use std::time::Duration;

const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with binary units
///
/// # Examples
///
/// ```
/// use bulkpulse::util::time::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(40 * 1024), "40.00 KiB");
/// assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.50 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bulkpulse::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_micros(250)), "250.00us");
/// assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
/// assert_eq!(format_duration(Duration::from_secs(150)), "2m30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else if duration.as_secs() < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{}s", secs / 60, secs % 60)
    }
}

/// Format an event rate (objects or operations per second)
///
/// # Examples
///
/// ```
/// use bulkpulse::util::time::format_rate;
///
/// assert_eq!(format_rate(12.345), "12.35");
/// assert_eq!(format_rate(1500.0), "1.50K");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate < 1_000.0 {
        format!("{:.2}", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else {
        format!("{:.2}M", rate / 1_000_000.0)
    }
}

/// Events per second over `duration`, 0 for an empty window
pub fn calculate_rate(count: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

/// Bytes per second over `duration`, 0 for an empty window
pub fn calculate_throughput(bytes: u64, duration: Duration) -> f64 {
    calculate_rate(bytes, duration)
}

/// Format a byte rate
///
/// # Examples
///
/// ```
/// use bulkpulse::util::time::format_throughput;
///
/// assert_eq!(format_throughput(1536.0), "1.50 KiB/s");
/// ```
pub fn format_throughput(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}
