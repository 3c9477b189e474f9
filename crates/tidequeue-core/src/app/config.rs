//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;
use crate::queue::{DEFAULT_STORAGE_KEY, RetryPolicy};

/// Tunables for the queue manager. Every field has a default, so an empty
/// TOML document is a valid config.
///
/// ```toml
/// max_retries = 3
/// base_delay_ms = 5000
/// scheduled_retries = true
/// storage_key = "offline_queue"
/// drain_interval_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Failed attempts before a record is marked failed.
    pub max_retries: u32,

    /// Backoff unit: the n-th retry waits `n * base_delay_ms`.
    pub base_delay_ms: u64,

    /// Retry a failed record on its own timer, besides the next drain.
    pub scheduled_retries: bool,

    /// Cache key the queue is persisted under.
    pub storage_key: String,

    /// Period of the background drain loop, if one is started.
    pub drain_interval_secs: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: RetryPolicy::DEFAULT_MAX_RETRIES,
            base_delay_ms: RetryPolicy::DEFAULT_BASE_DELAY.as_millis() as u64,
            scheduled_retries: true,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            drain_interval_secs: None,
        }
    }
}

impl QueueConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: QueueConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_policy()?;
        self.validate_storage()
    }

    /// Checks everything but the retry fields.
    pub(crate) fn validate_storage(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        if self.drain_interval_secs == Some(0) {
            return Err(ConfigError::ZeroDrainInterval);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }

    pub fn drain_interval(&self) -> Option<Duration> {
        self.drain_interval_secs.map(Duration::from_secs)
    }
}
