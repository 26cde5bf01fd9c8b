//! Configuration validation
//!
//! Everything here runs before any bucket is touched or worker spawned. Hard
//! errors abort the run; questionable but legal settings are logged as
//! warnings.

use super::*;
use crate::generator::pattern::MIN_BLOCK_SIZE;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &BenchConfig) -> Result<()> {
    validate_bench(&config.bench)?;
    validate_generator(config)?;
    validate_bulk(config)?;
    validate_autoterm(config)?;
    validate_simulation(&config.simulation)?;
    Ok(())
}

/// Validate general run parameters
pub fn validate_bench(bench: &BenchSection) -> Result<()> {
    if bench.concurrency == 0 {
        anyhow::bail!("bench.concurrency must be at least 1");
    }
    if bench.concurrency > usize::from(u16::MAX) {
        anyhow::bail!(
            "bench.concurrency must be at most {}, got {}",
            u16::MAX,
            bench.concurrency
        );
    }
    if bench.bucket.trim().is_empty() {
        anyhow::bail!("bench.bucket must not be empty");
    }
    parse_duration(&bench.duration).context("bench.duration")?;

    if bench.concurrency > 1000 {
        tracing::warn!(
            concurrency = bench.concurrency,
            "Very high concurrency, the client may become the bottleneck"
        );
    }
    Ok(())
}

/// Validate payload parameters
pub fn validate_generator(config: &BenchConfig) -> Result<()> {
    let g = &config.generator;
    let size = parse_size(&g.obj_size).context("generator.obj_size")?;
    if size == 0 {
        anyhow::bail!("generator.obj_size must be at least 1 byte");
    }

    let block_size = parse_size(&g.block_size).context("generator.block_size")?;
    if block_size <= MIN_BLOCK_SIZE as u64 {
        anyhow::bail!(
            "generator.block_size must be larger than {} bytes, got {}",
            MIN_BLOCK_SIZE,
            block_size
        );
    }

    if !(0.0..=1.0).contains(&g.compressibility) {
        anyhow::bail!(
            "generator.compressibility must be between 0.0 and 1.0, got {}",
            g.compressibility
        );
    }

    if g.prefix.is_some() && g.random_prefix {
        tracing::warn!("Both a custom and a random prefix are set; names use custom/random");
    }
    Ok(())
}

/// Validate bulk job parameters
pub fn validate_bulk(config: &BenchConfig) -> Result<()> {
    if config.bulk.objects == 0 {
        anyhow::bail!("bulk.objects must be at least 1");
    }
    let backoff = parse_duration(&config.bulk.backoff).context("bulk.backoff")?;
    if backoff.is_zero() {
        anyhow::bail!("bulk.backoff must be greater than zero");
    }

    // Each worker holds one generated block for its in-flight batch
    if let (Ok(size), Ok(block)) = (
        parse_size(&config.generator.obj_size),
        parse_size(&config.generator.block_size),
    ) {
        let total = size.min(block).saturating_mul(config.bench.concurrency as u64);
        if total > 4 << 30 {
            tracing::warn!(
                total = %crate::util::time::format_bytes(total),
                "Generated blocks of all workers use a lot of memory"
            );
        }
    }
    Ok(())
}

/// Validate auto-termination parameters
pub fn validate_autoterm(config: &BenchConfig) -> Result<()> {
    let a = &config.autoterm;
    if !a.enabled {
        return Ok(());
    }

    let window = parse_duration(&a.duration).context("autoterm.duration")?;
    if window.is_zero() {
        anyhow::bail!("autoterm.duration must be greater than zero when auto-termination is enabled");
    }
    if a.scale.is_nan() || a.scale <= 0.0 {
        anyhow::bail!("autoterm.scale must be greater than 0, got {}", a.scale);
    }

    if let Ok(Some(run)) = config.run_duration() {
        if window >= run {
            tracing::warn!(
                ?window,
                ?run,
                "Auto-termination window is not shorter than the run; it will never trigger"
            );
        }
    }
    Ok(())
}

/// Validate the simulated server
pub fn validate_simulation(sim: &SimulationConfig) -> Result<()> {
    if sim.objects_per_chunk == 0 {
        anyhow::bail!("simulation.objects_per_chunk must be at least 1");
    }
    Ok(())
}
