//! Retry policy: retry bound and backoff delays.

use std::time::Duration;

use crate::domain::ConfigError;

/// Retry policy for transient failures.
///
/// Linear backoff: the n-th failed attempt waits `base_delay * n` before its
/// scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

    pub fn new(max_retries: u32, base_delay: Duration) -> Result<Self, ConfigError> {
        if max_retries == 0 {
            return Err(ConfigError::ZeroMaxRetries);
        }
        if base_delay.is_zero() {
            return Err(ConfigError::ZeroBaseDelay);
        }
        Ok(Self {
            max_retries,
            base_delay,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay before the retry that follows `retry_count` failed attempts.
    ///
    /// Example with base_delay=5s:
    /// - 1 failure: 5s
    /// - 2 failures: 10s
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        self.base_delay.saturating_mul(retry_count.max(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            base_delay: Self::DEFAULT_BASE_DELAY,
        }
    }
}
