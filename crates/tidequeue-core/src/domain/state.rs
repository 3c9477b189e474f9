//! Operation status state machine.

use serde::{Deserialize, Serialize};

/// Status of an Operation Record.
///
/// State transitions:
/// - Pending -> Completed
/// - Pending -> Failed (conflict, permanent error, or retries exhausted)
///
/// A failed attempt that still has retries left keeps the record `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Waiting for a drain or a scheduled retry.
    Pending,

    /// Committed to the backing store.
    Completed,

    /// Rejected permanently. Only an operator action re-enqueues it.
    Failed,
}

impl OperationStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}
