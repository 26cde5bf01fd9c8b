// End-to-end bulk upload runs against the in-memory simulated server
//
// Run with: cargo test --test bulk_upload

use bulkpulse::bench::bulkput::BULK_PUT_OP;
use bulkpulse::client::memory::{InMemoryStore, SimulationConfig};
use bulkpulse::client::{SharedClient, StorageClient};
use bulkpulse::stats::OpSummary;
use bulkpulse::{run_benchmark, BenchConfig, Phase};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn small_config() -> BenchConfig {
    let mut config = BenchConfig::default();
    config.bench.concurrency = 4;
    config.bench.bucket = "it-bucket".to_string();
    config.bench.endpoint = "memory".to_string();
    config.generator.obj_size = "2k".to_string();
    config.generator.block_size = "8k".to_string();
    config.generator.seed = Some(42);
    config.bulk.objects = 100;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_operation_is_one_completed_job() {
    let mut config = small_config();
    config.bench.clear = false;
    let store = Arc::new(InMemoryStore::new(SimulationConfig {
        objects_per_chunk: 10,
        max_chunk_bytes: 1024,
        ..Default::default()
    }));
    let bench = config
        .bulk_put(Arc::new(SharedClient::new(store.clone())))
        .unwrap();

    let outcome = run_benchmark(&bench, &CancellationToken::new(), Some(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(outcome.ended, Phase::Completed);
    let ops = &outcome.operations;
    assert!(!ops.is_empty());
    assert_eq!(ops.len() as u64, store.completed_jobs());
    assert_eq!(store.open_jobs(), 0);
    assert_eq!(ops.errors(), 0);

    // Each operation covers exactly the manifest it declared
    let manifests: HashMap<String, u64> = store
        .manifests()
        .into_iter()
        .map(|(_, entries)| {
            let total = entries.iter().map(|e| e.size).sum();
            (entries[0].name.clone(), total)
        })
        .collect();
    for op in ops {
        assert_eq!(op.op_type, BULK_PUT_OP);
        assert_eq!(op.obj_per_op, 100);
        assert_eq!(op.endpoint, "memory");
        assert!(op.thread < 4);
        assert_eq!(manifests.get(&op.name), Some(&op.size));
    }

    // Uploads are kept when clearing is off
    assert_eq!(store.object_count("it-bucket") as u64, ops.total_objects());
    assert_eq!(ops.total_bytes(), ops.len() as u64 * 100 * 2048);

    let summary = OpSummary::from_operations(BULK_PUT_OP, ops);
    assert_eq!(summary.operations, ops.len());
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.threads, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clear_removes_uploads_after_run() {
    let config = small_config();
    let store = Arc::new(InMemoryStore::default());
    let bench = config
        .bulk_put(Arc::new(SharedClient::new(store.clone())))
        .unwrap();

    let outcome = run_benchmark(&bench, &CancellationToken::new(), Some(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(store.completed_jobs() > 0);
    assert_eq!(outcome.operations.len() as u64, store.completed_jobs());
    assert!(store.bucket_exists("it-bucket").await.unwrap());
    assert_eq!(store.object_count("it-bucket"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_auto_termination_stops_steady_run() {
    let mut config = small_config();
    config.bulk.objects = 10;
    config.autoterm.enabled = true;
    config.autoterm.duration = "700ms".to_string();
    config.autoterm.scale = 0.5;
    let store = Arc::new(InMemoryStore::new(SimulationConfig {
        upload_latency: Duration::from_millis(2),
        ..Default::default()
    }));
    let bench = config.bulk_put(Arc::new(SharedClient::new(store))).unwrap();

    let outcome = run_benchmark(&bench, &CancellationToken::new(), Some(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(outcome.ended, Phase::Completed);
    // 100ms segments; 25 of them must close before the run may stop
    assert!(outcome.elapsed >= Duration::from_millis(2500));
    assert!(outcome.elapsed < Duration::from_secs(25));
    assert!(outcome.operations.len() > 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupted_run_is_cancelled() {
    let mut config = small_config();
    config.bench.concurrency = 2;
    let store = Arc::new(InMemoryStore::default());
    let bench = config
        .bulk_put(Arc::new(SharedClient::new(store.clone())))
        .unwrap();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        interrupt.cancel();
    });

    let outcome = run_benchmark(&bench, &cancel, None).await.unwrap();

    assert_eq!(outcome.ended, Phase::Cancelled);
    assert_eq!(outcome.operations.len() as u64, store.completed_jobs());
}
