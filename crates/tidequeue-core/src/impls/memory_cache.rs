//! InMemoryCache: a DurableCache that lives as long as the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::CacheError;
use crate::ports::DurableCache;

/// Not durable across restarts; useful for tests and for clients that only
/// need the queue to survive connectivity loss.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), CacheError> {
        self.entries.lock().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
