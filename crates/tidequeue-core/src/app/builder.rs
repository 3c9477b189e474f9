//! QueueManagerBuilder - キューマネージャの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定は `build()` で検証し、永続化済みキューを読む前に弾く
//! - 構築後、キューはエラーを呼び出し側に返さない

use std::sync::Arc;

use super::config::QueueConfig;
use crate::domain::ConfigError;
use crate::ports::{BackingStore, Clock, DurableCache, IdGenerator, SystemClock, UlidGenerator};
use crate::queue::{ManagerParts, QueueManager, QueueStore, RetryPolicy};

/// Builds a [`QueueManager`].
///
/// # Example
/// ```ignore
/// let manager = QueueManager::builder(store, cache)
///     .config(QueueConfig::from_toml_str(&text)?)
///     .build()
///     .await?;
/// ```
pub struct QueueManagerBuilder {
    backing: Arc<dyn BackingStore>,
    cache: Arc<dyn DurableCache>,
    config: QueueConfig,
    retry_policy: Option<RetryPolicy>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl QueueManagerBuilder {
    pub fn new(backing: Arc<dyn BackingStore>, cache: Arc<dyn DurableCache>) -> Self {
        Self {
            backing,
            cache,
            config: QueueConfig::default(),
            retry_policy: None,
            clock: None,
            ids: None,
        }
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Takes precedence over the retry fields of the config.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn scheduled_retries(mut self, enabled: bool) -> Self {
        self.config.scheduled_retries = enabled;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage_key = key.into();
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a [`UlidGenerator`] on the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validate, restore the persisted queue and start the manager.
    pub async fn build(self) -> Result<QueueManager, ConfigError> {
        let retry_policy = match self.retry_policy {
            Some(policy) => policy,
            None => self.config.retry_policy()?,
        };
        self.config.validate_storage()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let store = QueueStore::new(self.cache, self.config.storage_key.clone());
        let records = store.load().await;
        tracing::info!(
            key = %store.key(),
            restored = records.len(),
            max_retries = retry_policy.max_retries(),
            "offline queue ready"
        );

        Ok(QueueManager::from_parts(ManagerParts {
            store,
            backing: self.backing,
            clock,
            ids,
            retry_policy,
            scheduled_retries: self.config.scheduled_retries,
            records,
        }))
    }
}
