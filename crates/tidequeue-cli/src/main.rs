use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tidequeue_core::impls::{FileCache, InMemoryBackingStore};
use tidequeue_core::ports::SystemClock;
use tidequeue_core::{OperationKind, QueueConfig, QueueManager, QueueStatus};
use tokio::time::{Duration, sleep};

const DATA_DIR_ENV: &str = "TIDEQUEUE_DATA_DIR";

fn load_config() -> Result<QueueConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            let config = QueueConfig::from_toml_str(&text)?;
            tracing::info!(%path, "loaded config");
            Ok(config)
        }
        None => Ok(QueueConfig::default()),
    }
}

fn print_status(label: &str, status: &QueueStatus) {
    println!(
        "[{label}] total={} pending={} completed={} failed={} draining={}",
        status.total, status.pending, status.completed, status.failed, status.is_draining
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let data_dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".tidequeue"));

    // (A) マリーナを用意（berth-3 は使用停止中）
    let store = Arc::new(InMemoryBackingStore::new(Arc::new(SystemClock)));
    store.add_resource("berth-1", true).await;
    store.add_resource("berth-2", true).await;
    store.add_resource("berth-3", false).await;

    let cache = FileCache::new(&data_dir);
    tracing::info!(dir = %cache.dir().display(), "using file cache");
    let manager = QueueManager::builder(store.clone(), Arc::new(cache))
        .config(config.clone())
        .build()
        .await?;
    print_status("restored", &manager.status().await);

    // (B) オフライン中に操作を積む（berth-1 への割り当ては 2 件目が衝突する）
    manager.set_online(false);
    manager
        .enqueue(
            OperationKind::AllocationCreate,
            json!({"resource_id": "berth-1", "owner": "M. Okafor", "vessel": "Sea Lark"}),
        )
        .await;
    manager
        .enqueue(
            OperationKind::AllocationCreate,
            json!({"resource_id": "berth-1", "owner": "J. Berg", "vessel": "Tern"}),
        )
        .await;
    manager
        .enqueue(
            OperationKind::ReservationCreate,
            json!({"resource_id": "berth-3", "guest": "visitor", "nights": 2}),
        )
        .await;
    manager
        .enqueue(OperationKind::TaskCreate, json!({"title": "check shore power on berth-2"}))
        .await;
    print_status("offline", &manager.status().await);

    // (C) 再接続して enqueue 順に再生
    manager.set_online(true);
    let summary = manager.drain().await;
    println!(
        "drained: attempted={} completed={} failed={} retrying={}",
        summary.attempted, summary.completed, summary.failed, summary.retrying
    );

    for record in manager.records().await {
        println!(
            "{} {:<20} {:?} retries={} error={}",
            record.id,
            record.kind,
            record.status,
            record.retry_count,
            record.last_error.as_deref().unwrap_or("-")
        );
    }

    // (D) drain_interval_secs があればバックグラウンドループも動かす
    if let Some(interval) = config.drain_interval() {
        let drain_loop = manager.spawn_drain_loop(interval);
        manager
            .enqueue(OperationKind::TaskCreate, json!({"title": "pump out berth-1"}))
            .await;
        sleep(Duration::from_millis(200)).await;
        drain_loop.shutdown_and_join().await;
    }

    let cleared = manager.clear_completed().await;
    println!("cleared {cleared} completed operations");
    print_status("final", &manager.status().await);
    println!("allocations in store: {}", store.allocations().await.len());

    Ok(())
}
