//! DurableCache port: local key/value blob storage that survives restarts.

use async_trait::async_trait;

use crate::domain::CacheError;

/// Key/value blob store used to persist the queue under a single key.
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, blob: String) -> Result<(), CacheError>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}
