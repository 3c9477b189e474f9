//! Operation Record: one queued, not-yet-confirmed mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::OperationId;
use super::kind::OperationKind;
use super::state::OperationStatus;

/// The unit of deferred work.
///
/// Design:
/// - Producers only create records; every status change goes through the
///   transition methods below, which the queue manager alone calls.
/// - Transitions out of a terminal state are refused, so a completed or
///   failed record never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    pub kind: OperationKind,
    pub payload: serde_json::Value,
    pub status: OperationStatus,

    /// Failed attempts so far.
    pub retry_count: u32,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,

    /// Reason of the last failed attempt, cleared on success.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl OperationRecord {
    pub fn new(
        id: OperationId,
        kind: OperationKind,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            status: OperationStatus::Pending,
            retry_count: 0,
            created_at,
            last_attempt_at: None,
            last_error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    /// Mark as committed. Returns false if the record was already terminal.
    pub(crate) fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Completed;
        self.last_attempt_at = Some(at);
        self.last_error = None;
        true
    }

    /// Mark as permanently failed without consuming a retry.
    pub(crate) fn mark_failed(&mut self, at: DateTime<Utc>, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OperationStatus::Failed;
        self.last_attempt_at = Some(at);
        self.last_error = Some(error.into());
        true
    }

    /// Record a transient failure.
    ///
    /// Returns true while the record stays `Pending` (retry allowed), false
    /// once `retry_count` reaches `max_retries` and the record is `Failed`.
    pub(crate) fn record_failed_attempt(
        &mut self,
        at: DateTime<Utc>,
        error: impl Into<String>,
        max_retries: u32,
    ) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.retry_count += 1;
        self.last_attempt_at = Some(at);
        self.last_error = Some(error.into());
        if self.retry_count >= max_retries {
            self.status = OperationStatus::Failed;
            return false;
        }
        true
    }
}
