//! CLI argument parsing using clap

use super::BenchConfig;
use crate::Result;
use clap::Parser;
use std::path::PathBuf;

/// bulkpulse - bulk upload benchmark for object storage
///
/// Every flag overrides the matching setting of the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "bulkpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long, env = "BULKPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    // === Run Options ===
    /// Number of concurrent workers
    #[arg(short = 't', long)]
    pub concurrency: Option<usize>,

    /// Bucket to upload into
    #[arg(long)]
    pub bucket: Option<String>,

    /// Endpoint label recorded on every operation
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Run duration (e.g., 30s, 5m); 0 runs until interrupted
    #[arg(short = 'd', long)]
    pub duration: Option<String>,

    /// Leave existing bucket contents in place and keep uploads afterwards
    #[arg(long)]
    pub no_clear: bool,

    // === Generator Options ===
    /// Object size (e.g., 64k, 1MiB)
    #[arg(short = 's', long)]
    pub obj_size: Option<String>,

    /// Draw object sizes uniformly up to --obj-size
    #[arg(long)]
    pub random_size: bool,

    /// Generated block size; larger objects repeat the block
    #[arg(long)]
    pub block_size: Option<String>,

    /// Fraction of each block filled with compressible pattern (0.0-1.0)
    #[arg(long)]
    pub compressibility: Option<f32>,

    /// Custom object name prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Add a random prefix to object names
    #[arg(long)]
    pub random_prefix: bool,

    /// Fixed seed for reproducible payloads
    #[arg(long)]
    pub seed: Option<u64>,

    // === Bulk Options ===
    /// Objects declared per bulk job
    #[arg(short = 'n', long)]
    pub objects: Option<usize>,

    /// Wait between polls while the server has no capacity (e.g., 5s, 500ms)
    #[arg(long)]
    pub backoff: Option<String>,

    // === Auto-termination ===
    /// Stop once throughput has been stable for --autoterm-dur
    #[arg(long)]
    pub autoterm: bool,

    /// Span that must show steady throughput
    #[arg(long)]
    pub autoterm_dur: Option<String>,

    /// Allowed relative deviation between segments
    #[arg(long)]
    pub autoterm_scale: Option<f64>,

    // === Simulated Server ===
    /// Object ranges per chunk granted by the simulated server
    #[arg(long)]
    pub objects_per_chunk: Option<usize>,

    /// Split objects larger than this into ranges (e.g., 8MiB)
    #[arg(long)]
    pub max_chunk_bytes: Option<String>,

    /// Empty polls answered for each job before chunks are ready
    #[arg(long)]
    pub busy_polls: Option<usize>,

    /// Artificial delay per upload in milliseconds
    #[arg(long)]
    pub upload_latency_ms: Option<u64>,

    // === Output Options ===
    /// Write the summary and raw operations as JSON
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub json_pretty: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long)]
    pub debug: bool,

    /// Validate configuration and print it without running
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Load the config file, if any, and apply the flags on top
    pub fn load_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)?,
            None => BenchConfig::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Override config values with every flag that was given
    pub fn apply(&self, config: &mut BenchConfig) -> Result<()> {
        let bench = &mut config.bench;
        if let Some(n) = self.concurrency {
            bench.concurrency = n;
        }
        if let Some(bucket) = &self.bucket {
            bench.bucket = bucket.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            bench.endpoint = endpoint.clone();
        }
        if let Some(duration) = &self.duration {
            bench.duration = duration.clone();
        }
        if self.no_clear {
            bench.clear = false;
        }

        let gen = &mut config.generator;
        if let Some(size) = &self.obj_size {
            gen.obj_size = size.clone();
        }
        if self.random_size {
            gen.random_size = true;
        }
        if let Some(block) = &self.block_size {
            gen.block_size = block.clone();
        }
        if let Some(c) = self.compressibility {
            gen.compressibility = c;
        }
        if let Some(prefix) = &self.prefix {
            gen.prefix = Some(prefix.clone());
        }
        if self.random_prefix {
            gen.random_prefix = true;
        }
        if self.seed.is_some() {
            gen.seed = self.seed;
        }

        if let Some(n) = self.objects {
            config.bulk.objects = n;
        }
        if let Some(backoff) = &self.backoff {
            config.bulk.backoff = backoff.clone();
        }

        if self.autoterm {
            config.autoterm.enabled = true;
        }
        if let Some(d) = &self.autoterm_dur {
            config.autoterm.duration = d.clone();
        }
        if let Some(scale) = self.autoterm_scale {
            config.autoterm.scale = scale;
        }

        let sim = &mut config.simulation;
        if let Some(n) = self.objects_per_chunk {
            sim.objects_per_chunk = n;
        }
        if let Some(max) = &self.max_chunk_bytes {
            sim.max_chunk_bytes = super::parse::parse_size(max)?;
        }
        if let Some(n) = self.busy_polls {
            sim.busy_polls = n;
        }
        if let Some(ms) = self.upload_latency_ms {
            sim.upload_latency = std::time::Duration::from_millis(ms);
        }

        if let Some(path) = &self.json_output {
            config.output.json = Some(path.clone());
        }
        if self.json_pretty {
            config.output.pretty = true;
        }
        Ok(())
    }
}
