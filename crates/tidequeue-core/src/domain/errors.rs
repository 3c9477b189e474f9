//! Error types and their operational classification.

use thiserror::Error;

/// Whether retrying the same operation can change the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retry is worthwhile (backing store unreachable, write rejected, ...).
    Transient,
    /// Retry is pointless (unknown kind, malformed payload).
    Permanent,
}

/// Failure reported by the backing store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("backing store rejected the write: {0}")]
    Rejected(String),
}

/// Failure reported by the durable local cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid cache key {0:?}")]
    InvalidKey(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Failure of a single execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unsupported operation kind {0:?}")]
    UnsupportedOperation(String),

    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl ExecuteError {
    pub fn invalid_payload(kind: impl ToString, reason: impl Into<String>) -> Self {
        ExecuteError::InvalidPayload {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecuteError::Store(_) => ErrorKind::Transient,
            ExecuteError::UnsupportedOperation(_) | ExecuteError::InvalidPayload { .. } => {
                ErrorKind::Permanent
            }
        }
    }
}

/// Construction-time misconfiguration. The only error surfaced to callers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_retries must be at least 1")]
    ZeroMaxRetries,

    #[error("base retry delay must be greater than zero")]
    ZeroBaseDelay,

    #[error("drain interval must be greater than zero")]
    ZeroDrainInterval,

    #[error("storage key must not be empty")]
    EmptyStorageKey,

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
