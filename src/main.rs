//! bulkpulse CLI entry point

use anyhow::{Context, Result};
use bulkpulse::bench::bulkput::BULK_PUT_OP;
use bulkpulse::client::memory::InMemoryStore;
use bulkpulse::client::SharedClient;
use bulkpulse::config::cli::Cli;
use bulkpulse::config::validator::validate_config;
use bulkpulse::output::{json, text};
use bulkpulse::stats::OpSummary;
use bulkpulse::util::time::format_duration;
use bulkpulse::{run_benchmark, BenchConfig};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    println!("bulkpulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Bulk upload benchmark for object storage");
    println!();

    let config = cli.load_config()?;
    validate_config(&config).context("Configuration validation failed")?;
    print_configuration(&config);

    if cli.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }
    println!();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(run(config))
}

/// Log filter comes from RUST_LOG, falling back to info (debug with --debug)
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: BenchConfig) -> Result<()> {
    let store = Arc::new(InMemoryStore::new(config.simulation.clone()));
    let bench = config.bulk_put(Arc::new(SharedClient::new(store)))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping workers");
            interrupt.cancel();
        }
    });

    let outcome = run_benchmark(&bench, &cancel, config.run_duration()?).await?;

    let summary = OpSummary::from_operations(BULK_PUT_OP, &outcome.operations);
    text::print_results(&summary, &outcome);

    if let Some(path) = &config.output.json {
        json::write_json_output(path, &summary, &outcome.operations, config.output.pretty)?;
        println!("Operations written to {}", path.display());
    }
    Ok(())
}

fn print_configuration(config: &BenchConfig) {
    println!("Configuration:");
    println!("  Run:");
    println!("    Workers: {}", config.bench.concurrency);
    println!("    Bucket: {}", config.bench.bucket);
    println!("    Endpoint: {}", config.bench.endpoint);
    match config.run_duration() {
        Ok(Some(d)) => println!("    Duration: {}", format_duration(d)),
        _ => println!("    Duration: until interrupted"),
    }
    if !config.bench.clear {
        println!("    Clear: off (existing objects are kept)");
    }

    println!("  Objects:");
    println!(
        "    Size: {}{}",
        config.generator.obj_size,
        if config.generator.random_size { " (random, max)" } else { "" }
    );
    println!("    Per job: {}", config.bulk.objects);
    println!("    Compressibility: {}", config.generator.compressibility);
    if let Some(prefix) = &config.generator.prefix {
        println!("    Prefix: {}", prefix);
    }

    if config.autoterm.enabled {
        println!("  Auto-termination:");
        println!("    Window: {}", config.autoterm.duration);
        println!("    Scale: {}", config.autoterm.scale);
    }

    let sim = &config.simulation;
    println!("  Simulated server:");
    println!("    Objects per chunk: {}", sim.objects_per_chunk);
    if sim.max_chunk_bytes > 0 {
        println!("    Max range: {} bytes", sim.max_chunk_bytes);
    }
    if sim.busy_polls > 0 {
        println!("    Busy polls per job: {}", sim.busy_polls);
    }
}
