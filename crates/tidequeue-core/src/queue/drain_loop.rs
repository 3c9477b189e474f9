//! Drain loop: the manager triggering its own drains.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::manager::QueueManager;

/// Background task draining the queue periodically and on nudges
/// (enqueue, coming back online).
///
/// - `request_shutdown()` で次の drain の前に止まる
/// - `shutdown_and_join()` は実行中の drain の完了も待つ
pub struct DrainLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DrainLoop {
    pub(crate) fn spawn(manager: QueueManager, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            drain_loop(manager, interval, &mut shutdown_rx).await;
        });
        Self { shutdown_tx, join }
    }

    /// Request shutdown. An in-flight drain is not cancelled; it just
    /// becomes the last one.
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "drain loop task failed");
        }
    }
}

async fn drain_loop(
    manager: QueueManager,
    interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(interval_ms = interval.as_millis() as u64, "drain loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
            _ = manager.nudged() => {}
        }

        let summary = manager.drain().await;
        if let Some(reason) = summary.skipped {
            tracing::debug!(?reason, "scheduled drain skipped");
        }
    }

    tracing::debug!("drain loop stopped");
}
