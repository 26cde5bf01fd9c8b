//! Human-readable text output

use crate::bench::lifecycle::RunOutcome;
use crate::stats::OpSummary;
use crate::util::time::{format_bytes, format_duration, format_rate, format_throughput};
use std::fmt::Write;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Print the run summary to stdout
pub fn print_results(summary: &OpSummary, outcome: &RunOutcome) {
    print!("{}", render_results(summary, outcome));
}

/// Render the run summary
///
/// # Example
///
/// ```
/// use bulkpulse::output::text::render_results;
/// use bulkpulse::stats::OpSummary;
/// use bulkpulse::{Operations, Phase, RunOutcome};
/// use std::time::Duration;
///
/// let outcome = RunOutcome {
///     ended: Phase::Completed,
///     operations: Operations::default(),
///     elapsed: Duration::from_secs(3),
/// };
/// let summary = OpSummary::from_operations("BULKPUT", &outcome.operations);
///
/// let text = render_results(&summary, &outcome);
/// assert!(text.contains("BENCHMARK RESULTS"));
/// assert!(text.contains("No latency data collected"));
/// ```
pub fn render_results(summary: &OpSummary, outcome: &RunOutcome) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_results(&mut out, summary, outcome);
    out
}

fn write_results(out: &mut String, summary: &OpSummary, outcome: &RunOutcome) -> std::fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "                    BENCHMARK RESULTS")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;

    writeln!(out, "Run:      {} after {}", outcome.ended, format_duration(outcome.elapsed))?;
    writeln!(out, "Workers:  {}", summary.threads)?;
    writeln!(out)?;

    writeln!(out, "Operations ({}):", summary.op_type)?;
    writeln!(out, "  Total:   {}", format_number(summary.operations as u64))?;
    writeln!(
        out,
        "  Objects: {} ({})",
        format_number(summary.total_objects),
        format_bytes(summary.total_bytes)
    )?;
    if summary.errors > 0 {
        writeln!(
            out,
            "  Errors:  {} ({:.2}%)",
            format_number(summary.errors as u64),
            summary.error_rate * 100.0
        )?;
    }
    writeln!(out)?;

    let t = &summary.throughput;
    writeln!(out, "Throughput:")?;
    if t.duration.is_zero() {
        writeln!(out, "  Not enough overlapping operations to measure")?;
    } else {
        writeln!(out, "  Window:  {}", format_duration(t.duration))?;
        writeln!(out, "  Data:    {}", format_throughput(t.bytes_per_sec()))?;
        writeln!(out, "  Objects: {} obj/s", format_rate(t.objects_per_sec()))?;
        writeln!(out, "  Jobs:    {} ops/s", format_rate(t.ops_per_sec()))?;
    }
    writeln!(out)?;

    writeln!(out, "Latency:")?;
    match &summary.latency {
        Some(l) => {
            writeln!(out, "  Min:  {}", format_duration(l.min))?;
            writeln!(out, "  Mean: {}", format_duration(l.mean))?;
            writeln!(out, "  p50:  {}", format_duration(l.p50))?;
            writeln!(out, "  p90:  {}", format_duration(l.p90))?;
            writeln!(out, "  p99:  {}", format_duration(l.p99))?;
            writeln!(out, "  Max:  {}", format_duration(l.max))?;
        }
        None => writeln!(out, "  No latency data collected")?,
    }
    writeln!(out, "{}", RULE)
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::lifecycle::Phase;
    use crate::bench::ops::tests::op_at;
    use crate::bench::ops::Operations;
    use std::time::Duration;

    fn outcome(ops: Operations) -> RunOutcome {
        RunOutcome {
            ended: Phase::Completed,
            operations: ops,
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_render_results() {
        let mut failed = op_at(1, 0, 500, 100);
        failed.error = Some("short upload".to_string());
        let ops = Operations::new(vec![
            op_at(0, 0, 500, 1024),
            op_at(0, 500, 1000, 1024),
            op_at(1, 500, 1000, 1024),
            failed,
        ]);
        let summary = OpSummary::from_operations("BULKPUT", &ops);
        let text = render_results(&summary, &outcome(ops));

        assert!(text.contains("Run:      completed after 2.00s"));
        assert!(text.contains("Operations (BULKPUT):"));
        assert!(text.contains("Objects: 30 (3.00 KiB)"));
        assert!(text.contains("Errors:  1 (25.00%)"));
        assert!(text.contains("p99:"));
    }

    #[test]
    fn test_render_empty_run() {
        let summary = OpSummary::from_operations("BULKPUT", &Operations::default());
        let text = render_results(&summary, &outcome(Operations::default()));

        assert!(text.contains("Not enough overlapping operations"));
        assert!(text.contains("No latency data collected"));
        assert!(!text.contains("Errors:"));
    }
}
