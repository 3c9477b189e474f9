//! Read-only views of the queue for UIs and logs.

use serde::{Deserialize, Serialize};

use crate::domain::{OperationRecord, OperationStatus};

/// Counts by status plus the drain flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub is_draining: bool,
}

impl QueueStatus {
    pub fn from_records(records: &[OperationRecord], is_draining: bool) -> Self {
        let mut status = QueueStatus {
            total: records.len(),
            is_draining,
            ..QueueStatus::default()
        };
        for record in records {
            match record.status {
                OperationStatus::Pending => status.pending += 1,
                OperationStatus::Completed => status.completed += 1,
                OperationStatus::Failed => status.failed += 1,
            }
        }
        status
    }
}

/// Why a drain did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyDraining,
    Offline,
}

/// What one `drain()` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,

    /// Records actually attempted. A record settled by a scheduled retry
    /// before its turn came is not counted.
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,

    /// Attempts that failed but left the record pending.
    pub retrying: usize,
}

impl DrainSummary {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}
