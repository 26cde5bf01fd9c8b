//! Human-readable size and duration parsing

use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a size string (e.g. "4096", "64k", "1MiB", "2GB") to bytes
///
/// Units are binary: `k`, `kb` and `kib` all mean 1024 bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num_str, unit) = s.split_at(split);

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        other => anyhow::bail!("Invalid size unit {:?} in {:?}", other, s),
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g. "500ms", "30s", "5m", "1h") to a [`Duration`]
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num_str, unit) = s.split_at(split);

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    let duration = match unit.trim() {
        "ms" => Duration::from_millis(num),
        "" | "s" | "sec" => Duration::from_secs(num),
        "m" | "min" => Duration::from_secs(num * 60),
        "h" | "hr" => Duration::from_secs(num * 3600),
        other => anyhow::bail!("Invalid duration unit {:?} in {:?}", other, s),
    };
    Ok(duration)
}
