//! Queue Manager: owns the in-memory queue, drains it, schedules retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Notify};

use super::conflict::ConflictChecker;
use super::drain_loop::DrainLoop;
use super::executor::OperationExecutor;
use super::retry::RetryPolicy;
use super::status::{DrainSummary, QueueStatus, SkipReason};
use super::store::QueueStore;
use crate::domain::payload;
use crate::domain::{
    ConflictReason, ErrorKind, ExecuteError, OperationId, OperationKind, OperationRecord,
    OperationStatus,
};
use crate::ports::{BackingStore, Clock, IdGenerator};

/// Everything the builder resolved before the manager starts.
pub(crate) struct ManagerParts {
    pub store: QueueStore,
    pub backing: Arc<dyn BackingStore>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub retry_policy: RetryPolicy,
    pub scheduled_retries: bool,
    pub records: Vec<OperationRecord>,
}

struct QueueState {
    /// All records in enqueue order (single source of truth).
    records: Vec<OperationRecord>,
}

struct Inner {
    state: Mutex<QueueState>,

    /// Held from claim to settle. Drains and scheduled retries take turns, so
    /// no claim is checked while an earlier one is still being committed.
    processing: Mutex<()>,

    /// Serializes snapshot + write so the cache never goes backwards.
    persist_lock: Mutex<()>,

    draining: AtomicBool,
    online: AtomicBool,
    nudge: Notify,

    store: QueueStore,
    checker: ConflictChecker,
    executor: OperationExecutor,
    retry_policy: RetryPolicy,
    scheduled_retries: bool,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// Result of one attempt, before it is applied to the record.
enum Attempt {
    Completed,
    Conflict {
        resource_id: String,
        reason: ConflictReason,
    },
    Failed(ExecuteError),
}

/// Record state after an attempt was applied.
enum Settled {
    Completed,
    Failed,
    Retrying(Duration),
    /// The record was cleared while its attempt was in flight.
    Discarded,
}

/// Resets the draining flag however the drain ends.
struct DrainingGuard<'a>(&'a AtomicBool);

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Inner {
    /// Kind and payload of `id` if it is still pending.
    async fn claim(&self, id: OperationId) -> Option<(OperationKind, Value)> {
        let state = self.state.lock().await;
        let record = state.records.iter().find(|r| r.id == id)?;
        if !record.is_pending() {
            return None;
        }
        Some((record.kind.clone(), record.payload.clone()))
    }

    /// Conflict check (claiming kinds only), then execution.
    ///
    /// Runs without the state lock: both steps await the backing store.
    async fn attempt(&self, id: OperationId, kind: &OperationKind, payload: &Value) -> Attempt {
        tracing::debug!(op_id = %id, %kind, "attempting operation");

        if kind.claims_resource() {
            let resource_id = match payload::claimed_resource(kind, payload) {
                Ok(resource_id) => resource_id,
                Err(e) => return Attempt::Failed(e),
            };
            if let Some(resource_id) = resource_id {
                match self.checker.check_conflict(&resource_id).await {
                    Ok(Some(reason)) => return Attempt::Conflict { resource_id, reason },
                    Ok(None) => {}
                    Err(e) => return Attempt::Failed(e.into()),
                }
            }
        }

        match self.executor.execute(kind, payload).await {
            Ok(_) => Attempt::Completed,
            Err(e) => Attempt::Failed(e),
        }
    }

    /// Apply an attempt's result to the record.
    async fn settle(&self, id: OperationId, attempt: Attempt) -> Settled {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(op_id = %id, "record cleared while in flight; dropping result");
            return Settled::Discarded;
        };

        match attempt {
            Attempt::Completed => {
                record.mark_completed(now);
                tracing::info!(op_id = %id, kind = %record.kind, "operation committed");
                Settled::Completed
            }
            Attempt::Conflict {
                resource_id,
                reason,
            } => {
                record.mark_failed(now, reason.to_string());
                tracing::warn!(op_id = %id, kind = %record.kind, resource_id = %resource_id, %reason, "operation rejected by conflict check");
                Settled::Failed
            }
            Attempt::Failed(err) if err.kind() == ErrorKind::Permanent => {
                record.mark_failed(now, err.to_string());
                tracing::warn!(op_id = %id, kind = %record.kind, error = %err, "operation failed permanently");
                Settled::Failed
            }
            Attempt::Failed(err) => {
                let max_retries = self.retry_policy.max_retries();
                if record.record_failed_attempt(now, err.to_string(), max_retries) {
                    let delay = self.retry_policy.next_delay(record.retry_count);
                    tracing::warn!(
                        op_id = %id,
                        kind = %record.kind,
                        retry_count = record.retry_count,
                        error = %err,
                        "operation attempt failed; will retry"
                    );
                    Settled::Retrying(delay)
                } else {
                    tracing::warn!(
                        op_id = %id,
                        kind = %record.kind,
                        retry_count = record.retry_count,
                        error = %err,
                        "operation failed; retries exhausted"
                    );
                    Settled::Failed
                }
            }
        }
    }

    /// Claim, attempt and settle one record. `None` if it is no longer pending.
    ///
    /// Waits for any attempt already running, whether it belongs to a drain
    /// or a scheduled retry.
    async fn process(&self, id: OperationId) -> Option<Settled> {
        let _turn = self.processing.lock().await;
        let (kind, payload) = self.claim(id).await?;
        let attempt = self.attempt(id, &kind, &payload).await;
        Some(self.settle(id, attempt).await)
    }

    /// Write the whole queue to the durable cache.
    ///
    /// A failed write is logged only: in-memory state stays authoritative for
    /// this process.
    async fn persist(&self) {
        let _serial = self.persist_lock.lock().await;
        let records = self.state.lock().await.records.clone();
        let result = if records.is_empty() {
            self.store.clear().await
        } else {
            self.store.save(&records).await
        };
        if let Err(e) = result {
            tracing::warn!(key = %self.store.key(), error = %e, "failed to persist offline queue; keeping in-memory state");
        }
    }

    /// Retry a single record after `delay`, independent of full drains.
    fn schedule_retry(self: &Arc<Self>, id: OperationId, delay: Duration) {
        if !self.scheduled_retries {
            return;
        }
        tracing::debug!(op_id = %id, delay_ms = delay.as_millis() as u64, "scheduling retry");

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !inner.online.load(Ordering::Acquire) {
                tracing::debug!(op_id = %id, "offline; leaving retry to the next drain");
                return;
            }
            match inner.process(id).await {
                Some(settled) => {
                    inner.persist().await;
                    if let Settled::Retrying(next) = settled {
                        inner.schedule_retry(id, next);
                    }
                }
                None => {
                    tracing::debug!(op_id = %id, "scheduled retry skipped; record no longer pending");
                }
            }
        });
    }
}

/// Handle to the offline operation queue.
///
/// Cheap to clone; all clones share one queue. Construct it once at the
/// composition root with [`QueueManager::builder`] and hand clones out.
///
/// # Concurrency
/// - At most one drain runs at a time; a concurrent `drain()` returns immediately.
/// - Within a drain, records are attempted one at a time in enqueue order.
/// - Drains and scheduled retries take turns: only one record is attempted at
///   a time, so a later claim on a resource never overtakes an earlier one.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

impl QueueManager {
    pub fn builder(
        backing: Arc<dyn BackingStore>,
        cache: Arc<dyn crate::ports::DurableCache>,
    ) -> crate::app::QueueManagerBuilder {
        crate::app::QueueManagerBuilder::new(backing, cache)
    }

    pub(crate) fn from_parts(parts: ManagerParts) -> Self {
        let checker = ConflictChecker::new(Arc::clone(&parts.backing));
        let executor = OperationExecutor::new(parts.backing, Arc::clone(&parts.clock));
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    records: parts.records,
                }),
                processing: Mutex::new(()),
                persist_lock: Mutex::new(()),
                draining: AtomicBool::new(false),
                online: AtomicBool::new(true),
                nudge: Notify::new(),
                store: parts.store,
                checker,
                executor,
                retry_policy: parts.retry_policy,
                scheduled_retries: parts.scheduled_retries,
                clock: parts.clock,
                ids: parts.ids,
            }),
        }
    }

    /// Append an operation and persist the queue.
    ///
    /// Always succeeds and never touches the backing store.
    pub async fn enqueue(&self, kind: OperationKind, payload: Value) -> OperationId {
        let id = self.inner.ids.generate_operation_id();
        let record = OperationRecord::new(id, kind, payload, self.inner.clock.now());
        tracing::info!(op_id = %id, kind = %record.kind, "operation enqueued");

        self.inner.state.lock().await.records.push(record);
        self.inner.persist().await;
        self.nudge();
        id
    }

    /// Attempt every pending record once, in enqueue order, then persist.
    ///
    /// Individual failures are recorded on their records; nothing aborts the
    /// pass. Returns immediately if a drain is already running or the manager
    /// is offline.
    pub async fn drain(&self) -> DrainSummary {
        let inner = &self.inner;
        if !inner.online.load(Ordering::Acquire) {
            tracing::debug!("offline; drain skipped");
            return DrainSummary::skipped(SkipReason::Offline);
        }
        if inner
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("drain already in progress");
            return DrainSummary::skipped(SkipReason::AlreadyDraining);
        }
        let _draining = DrainingGuard(&inner.draining);

        let snapshot: Vec<OperationId> = {
            let state = inner.state.lock().await;
            state
                .records
                .iter()
                .filter(|r| r.is_pending())
                .map(|r| r.id)
                .collect()
        };
        tracing::info!(pending = snapshot.len(), "draining offline queue");

        let mut summary = DrainSummary::default();
        for id in snapshot {
            if !inner.online.load(Ordering::Acquire) {
                tracing::info!("went offline; stopping drain early");
                break;
            }
            let Some(settled) = inner.process(id).await else {
                continue;
            };
            summary.attempted += 1;
            match settled {
                Settled::Completed => summary.completed += 1,
                Settled::Failed => summary.failed += 1,
                Settled::Retrying(delay) => {
                    summary.retrying += 1;
                    inner.schedule_retry(id, delay);
                }
                Settled::Discarded => {}
            }
        }

        inner.persist().await;
        tracing::info!(
            attempted = summary.attempted,
            completed = summary.completed,
            failed = summary.failed,
            retrying = summary.retrying,
            "drain finished"
        );
        summary
    }

    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        QueueStatus::from_records(&state.records, self.is_draining())
    }

    pub async fn record(&self, id: OperationId) -> Option<OperationRecord> {
        let state = self.inner.state.lock().await;
        state.records.iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot of all records in enqueue order.
    pub async fn records(&self) -> Vec<OperationRecord> {
        self.inner.state.lock().await.records.clone()
    }

    pub async fn clear_completed(&self) -> usize {
        self.remove_where(|r| r.status == OperationStatus::Completed).await
    }

    pub async fn clear_failed(&self) -> usize {
        self.remove_where(|r| r.status == OperationStatus::Failed).await
    }

    pub async fn clear_all(&self) -> usize {
        self.remove_where(|_| true).await
    }

    /// Operator action: enqueue a fresh copy of a failed operation.
    ///
    /// The failed record itself is left as is. Returns `None` unless `id`
    /// names a `Failed` record.
    pub async fn retry_failed(&self, id: OperationId) -> Option<OperationId> {
        let (kind, payload) = {
            let state = self.inner.state.lock().await;
            let record = state
                .records
                .iter()
                .find(|r| r.id == id && r.status == OperationStatus::Failed)?;
            (record.kind.clone(), record.payload.clone())
        };
        tracing::info!(op_id = %id, "re-enqueueing failed operation");
        Some(self.enqueue(kind, payload).await)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    /// Record connectivity. While offline, drains and scheduled retries do
    /// nothing, so retries are not burned against an unreachable store.
    pub fn set_online(&self, online: bool) {
        let was = self.inner.online.swap(online, Ordering::AcqRel);
        if online && !was {
            tracing::info!("back online");
            self.nudge();
        } else if !online && was {
            tracing::info!("went offline");
        }
    }

    /// Wake the drain loop (if one is running) for an early drain.
    pub fn nudge(&self) {
        self.inner.nudge.notify_one();
    }

    pub(crate) async fn nudged(&self) {
        self.inner.nudge.notified().await;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry_policy
    }

    /// Drain every `interval`, and whenever nudged.
    pub fn spawn_drain_loop(&self, interval: Duration) -> DrainLoop {
        DrainLoop::spawn(self.clone(), interval)
    }

    async fn remove_where(&self, matches: impl Fn(&OperationRecord) -> bool) -> usize {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let before = state.records.len();
            state.records.retain(|r| !matches(r));
            before - state.records.len()
        };
        tracing::info!(removed, "cleared operations");
        self.inner.persist().await;
        removed
    }
}
