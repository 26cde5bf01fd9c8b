//! JSON operation export
//!
//! The summary and the raw operation set are written as one JSON document,
//! operations carrying RFC 3339 timestamps. Files from several clients can be
//! read back and merged into one set before summarizing.

use crate::bench::ops::Operations;
use crate::stats::OpSummary;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: &'a OpSummary,
    operations: &'a Operations,
}

/// Write the summary and every operation record to `path`
///
/// # Arguments
///
/// * `path` - Destination file, created or truncated
/// * `summary` - Summary of the reported operation type
/// * `ops` - Every record of the run, failed ones included
/// * `pretty` - Indent the document
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
///
/// # Example
///
/// ```
/// use bulkpulse::output::json::{read_operations, write_json_output};
/// use bulkpulse::stats::OpSummary;
/// use bulkpulse::Operations;
///
/// let dir = tempfile::TempDir::new()?;
/// let path = dir.path().join("ops.json");
/// let ops = Operations::default();
/// let summary = OpSummary::from_operations("BULKPUT", &ops);
///
/// write_json_output(&path, &summary, &ops, true)?;
/// assert!(read_operations(&[&path])?.is_empty());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn write_json_output(
    path: &Path,
    summary: &OpSummary,
    ops: &Operations,
    pretty: bool,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let output = JsonOutput {
        summary,
        operations: ops,
    };

    if pretty {
        serde_json::to_writer_pretty(&mut writer, &output)?;
    } else {
        serde_json::to_writer(&mut writer, &output)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read the operation records from files written by [`write_json_output`]
/// and merge them into one set
///
/// The merged set is sorted by start time, so results of several clients can
/// be summarized as one run.
///
/// # Arguments
///
/// * `paths` - JSON documents to read, in any order
///
/// # Errors
///
/// Returns an error naming the file that could not be opened or parsed.
pub fn read_operations<P: AsRef<Path>>(paths: &[P]) -> Result<Operations> {
    #[derive(serde::Deserialize)]
    struct Stored {
        operations: Operations,
    }

    let mut merged = Operations::default();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let stored: Stored = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse operations from {}", path.display()))?;
        merged.merge(stored.operations);
    }
    merged.sort_by_start_time();
    Ok(merged)
}
