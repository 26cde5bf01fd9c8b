//! Configuration module
//!
//! A run is described by a [`BenchConfig`], loaded from a TOML file and/or
//! built from command-line flags (flags win). Sizes and durations are kept as
//! human-readable strings ("1MiB", "30s") and parsed when the run is assembled,
//! so a config file reads the same way the command line does.
//!
//! ```toml
//! [bench]
//! concurrency = 8
//! bucket = "bench"
//! duration = "2m"
//!
//! [generator]
//! obj_size = "4MiB"
//! compressibility = 0.3
//!
//! [bulk]
//! objects = 50
//!
//! [autoterm]
//! enabled = true
//! duration = "20s"
//! ```

pub mod cli;
pub mod parse;
pub mod validator;

use crate::bench::bulkput::BulkPut;
use crate::bench::BenchmarkCommon;
use crate::client::memory::SimulationConfig;
use crate::client::{ClientFactory, PutOptions};
use crate::generator::pattern::PatternOptions;
use crate::generator::GeneratorOptions;
use crate::Result;
use anyhow::Context;
use parse::{parse_duration, parse_size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Complete benchmark configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub bench: BenchSection,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub bulk: BulkSection,
    #[serde(default)]
    pub autoterm: AutoTermSection,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub output: OutputSection,
}

/// General run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchSection {
    /// Number of concurrent workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Endpoint label recorded on every operation
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Run length; "0" runs until interrupted or auto-terminated
    #[serde(default = "default_duration")]
    pub duration: String,
    /// Empty the bucket before the run and remove uploads afterwards
    #[serde(default = "default_true")]
    pub clear: bool,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default)]
    pub client_mode: bool,
    #[serde(default)]
    pub client_idx: usize,
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub send_content_md5: bool,
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            bucket: default_bucket(),
            endpoint: default_endpoint(),
            duration: default_duration(),
            clear: true,
            versioned: false,
            client_mode: false,
            client_idx: 0,
            storage_class: None,
            send_content_md5: false,
        }
    }
}

fn default_concurrency() -> usize {
    20
}

fn default_bucket() -> String {
    "bulkpulse-benchmark-bucket".to_string()
}

fn default_endpoint() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_duration() -> String {
    "5m".to_string()
}

fn default_true() -> bool {
    true
}

/// Synthetic payload parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSection {
    /// Object size, or maximum size with `random_size`
    #[serde(default = "default_obj_size")]
    pub obj_size: String,
    #[serde(default)]
    pub random_size: bool,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub random_prefix: bool,
    /// Generated block size; larger objects repeat the block
    #[serde(default = "default_block_size")]
    pub block_size: String,
    #[serde(default = "default_compressibility")]
    pub compressibility: f32,
    /// Fixed seed for reproducible payloads
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            obj_size: default_obj_size(),
            random_size: false,
            prefix: None,
            random_prefix: false,
            block_size: default_block_size(),
            compressibility: default_compressibility(),
            seed: None,
        }
    }
}

fn default_obj_size() -> String {
    "1MiB".to_string()
}

fn default_block_size() -> String {
    "16MiB".to_string()
}

fn default_compressibility() -> f32 {
    0.5
}

/// Bulk job parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSection {
    /// Objects declared per bulk job
    #[serde(default = "default_bulk_objects")]
    pub objects: usize,
    /// Wait between polls while the server has no capacity
    #[serde(default = "default_backoff")]
    pub backoff: String,
}

impl Default for BulkSection {
    fn default() -> Self {
        Self {
            objects: default_bulk_objects(),
            backoff: default_backoff(),
        }
    }
}

fn default_bulk_objects() -> usize {
    100
}

fn default_backoff() -> String {
    "5s".to_string()
}

/// Auto-termination parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTermSection {
    #[serde(default)]
    pub enabled: bool,
    /// Span that must show steady throughput
    #[serde(default = "default_autoterm_duration")]
    pub duration: String,
    /// Allowed relative deviation between segments
    #[serde(default = "default_autoterm_scale")]
    pub scale: f64,
}

impl Default for AutoTermSection {
    fn default() -> Self {
        Self {
            enabled: false,
            duration: default_autoterm_duration(),
            scale: default_autoterm_scale(),
        }
    }
}

fn default_autoterm_duration() -> String {
    "10s".to_string()
}

fn default_autoterm_scale() -> f64 {
    0.075
}

/// Result output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    /// Write the summary and raw operations as JSON to this path
    #[serde(default)]
    pub json: Option<PathBuf>,
    #[serde(default)]
    pub pretty: bool,
}

impl BenchConfig {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML configuration")
    }

    /// Generator options with sizes resolved
    pub fn generator_options(&self) -> Result<GeneratorOptions> {
        let g = &self.generator;
        let size = parse_size(&g.obj_size).context("generator.obj_size")?;
        let block_size = parse_size(&g.block_size).context("generator.block_size")?;
        let block_size = usize::try_from(block_size).context("generator.block_size too large")?;

        let mut pattern = PatternOptions::default()
            .block_size(block_size)
            .compressibility(g.compressibility);
        if let Some(seed) = g.seed {
            pattern = pattern.seed(seed);
        }

        let mut opts = GeneratorOptions::default()
            .size(size)
            .random_size(g.random_size)
            .random_prefix(g.random_prefix)
            .pattern(pattern);
        if let Some(prefix) = &g.prefix {
            opts = opts.prefix(prefix.clone());
        }
        Ok(opts)
    }

    /// Overall run limit; `None` runs until interrupted or auto-terminated
    pub fn run_duration(&self) -> Result<Option<Duration>> {
        let d = parse_duration(&self.bench.duration).context("bench.duration")?;
        Ok((!d.is_zero()).then_some(d))
    }

    pub fn backoff(&self) -> Result<Duration> {
        parse_duration(&self.bulk.backoff).context("bulk.backoff")
    }

    /// Auto-termination window, zero when disabled
    pub fn auto_term_duration(&self) -> Result<Duration> {
        if !self.autoterm.enabled {
            return Ok(Duration::ZERO);
        }
        parse_duration(&self.autoterm.duration).context("autoterm.duration")
    }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            storage_class: self.bench.storage_class.clone(),
            send_content_md5: self.bench.send_content_md5,
            content_type: None,
        }
    }

    /// Shared benchmark parameters for workers using `client`
    pub fn benchmark_common(&self, client: Arc<dyn ClientFactory>) -> Result<BenchmarkCommon> {
        let mut common = BenchmarkCommon::new(client, &self.bench.bucket);
        common.concurrency = self.bench.concurrency;
        common.source = self.generator_options()?;
        common.endpoint = self.bench.endpoint.clone();
        common.client_mode = self.bench.client_mode;
        common.clear = self.bench.clear;
        common.versioned = self.bench.versioned;
        common.auto_term_dur = self.auto_term_duration()?;
        common.auto_term_scale = self.autoterm.scale;
        common.put_opts = self.put_options();
        common.client_idx = self.bench.client_idx;
        Ok(common)
    }

    /// Bulk put benchmark described by this configuration
    pub fn bulk_put(&self, client: Arc<dyn ClientFactory>) -> Result<BulkPut> {
        let bench = BulkPut::new(self.benchmark_common(client)?, self.bulk.objects)?;
        Ok(bench.with_backoff(self.backoff()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.bench.concurrency, 20);
        assert!(config.bench.clear);
        assert_eq!(config.bulk.objects, 100);
        assert_eq!(config.backoff().unwrap(), Duration::from_secs(5));
        assert_eq!(config.run_duration().unwrap(), Some(Duration::from_secs(300)));
        assert_eq!(config.auto_term_duration().unwrap(), Duration::ZERO);
        assert_eq!(config.simulation, SimulationConfig::default());

        let gen = config.generator_options().unwrap();
        assert_eq!(gen.size, 1024 * 1024);
        assert_eq!(gen.pattern.block_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = BenchConfig::from_toml_str(
            r#"
            [bench]
            concurrency = 4
            duration = "0"

            [generator]
            obj_size = "64k"
            prefix = "run-1"
            seed = 9

            [autoterm]
            enabled = true
            duration = "14s"

            [simulation]
            busy_polls = 3
            upload_latency_ms = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.bench.concurrency, 4);
        assert_eq!(config.bench.bucket, "bulkpulse-benchmark-bucket");
        assert_eq!(config.run_duration().unwrap(), None);
        assert_eq!(config.auto_term_duration().unwrap(), Duration::from_secs(14));
        assert_eq!(config.simulation.busy_polls, 3);
        assert_eq!(config.simulation.objects_per_chunk, 10);
        assert_eq!(config.simulation.upload_latency, Duration::from_millis(2));

        let gen = config.generator_options().unwrap();
        assert_eq!(gen.size, 64 * 1024);
        assert_eq!(gen.prefix.as_deref(), Some("run-1"));
        assert_eq!(gen.pattern.seed, Some(9));
    }

    #[test]
    fn test_bad_size_names_field() {
        let mut config = BenchConfig::default();
        config.generator.obj_size = "lots".to_string();
        let err = config.generator_options().unwrap_err();
        assert!(format!("{:#}", err).contains("generator.obj_size"));
    }

    #[test]
    fn test_bulk_put_from_config() {
        use crate::client::memory::InMemoryStore;
        use crate::client::SharedClient;

        let mut config = BenchConfig::default();
        config.bench.concurrency = 3;
        config.bench.clear = false;
        config.bulk.objects = 7;
        config.autoterm.enabled = true;
        let client = Arc::new(SharedClient::new(Arc::new(InMemoryStore::default())));

        let bench = config.bulk_put(client).unwrap();
        assert_eq!(bench.bulk_num(), 7);

        let common = crate::bench::Benchmark::common(&bench);
        assert_eq!(common.concurrency, 3);
        assert!(!common.clear);
        assert_eq!(common.auto_term_dur, Duration::from_secs(10));
        assert_eq!(common.source.size, 1024 * 1024);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(BenchConfig::from_toml_str("[bench\nconcurrency = 1").is_err());
        assert!(BenchConfig::from_toml_str("[bench]\nconcurrency = \"many\"").is_err());
    }
}
