//! Durable Queue Store: the whole queue persisted under one cache key.
//!
//! Every save rewrites the full collection. Queues are small (pending client
//! actions), so there is no incremental persistence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{CacheError, OperationRecord};
use crate::ports::DurableCache;

pub const DEFAULT_STORAGE_KEY: &str = "offline_queue";

const FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct PersistedQueue {
    version: u32,
    records: Vec<OperationRecord>,
}

#[derive(Serialize)]
struct PersistedQueueRef<'a> {
    version: u32,
    records: &'a [OperationRecord],
}

/// Loads and saves the operation list through a [`DurableCache`].
#[derive(Clone)]
pub struct QueueStore {
    cache: Arc<dyn DurableCache>,
    key: String,
}

impl QueueStore {
    pub fn new(cache: Arc<dyn DurableCache>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Restore the persisted queue.
    ///
    /// Never fails: a missing, unreadable or undecodable blob yields an empty
    /// queue. Losing the local cache must not take the client down.
    pub async fn load(&self) -> Vec<OperationRecord> {
        let blob = match self.cache.get(&self.key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read offline queue; starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<PersistedQueue>(&blob) {
            Ok(persisted) if persisted.version == FORMAT_VERSION => {
                tracing::debug!(key = %self.key, records = persisted.records.len(), "restored offline queue");
                persisted.records
            }
            Ok(persisted) => {
                tracing::warn!(
                    key = %self.key,
                    version = persisted.version,
                    "unknown offline queue format; starting empty"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "corrupt offline queue; starting empty");
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted queue with `records`.
    pub async fn save(&self, records: &[OperationRecord]) -> Result<(), CacheError> {
        let blob = serde_json::to_string(&PersistedQueueRef {
            version: FORMAT_VERSION,
            records,
        })?;
        self.cache.set(&self.key, blob).await
    }

    /// Drop the persisted queue entirely.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.cache.remove(&self.key).await
    }
}
