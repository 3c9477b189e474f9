//! Operation kinds: the closed set of mutations the queue can replay.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mutation type of an Operation Record.
///
/// Serialized as a snake_case string. A persisted queue written by a newer
/// build may name a kind this build does not know; it loads as
/// `Unsupported(name)` and the executor rejects it permanently.
///
/// Adding a kind means adding a variant here and an arm in the executor; the
/// exhaustive match makes a missing arm a compile error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    AllocationCreate,
    AllocationUpdate,
    BillCreate,
    PaymentApply,
    TaskCreate,
    TaskUpdate,
    ReservationCreate,
    ReservationUpdate,
    Unsupported(String),
}

impl OperationKind {
    /// Every kind this build can execute.
    pub const SUPPORTED: [OperationKind; 8] = [
        OperationKind::AllocationCreate,
        OperationKind::AllocationUpdate,
        OperationKind::BillCreate,
        OperationKind::PaymentApply,
        OperationKind::TaskCreate,
        OperationKind::TaskUpdate,
        OperationKind::ReservationCreate,
        OperationKind::ReservationUpdate,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::AllocationCreate => "allocation_create",
            OperationKind::AllocationUpdate => "allocation_update",
            OperationKind::BillCreate => "bill_create",
            OperationKind::PaymentApply => "payment_apply",
            OperationKind::TaskCreate => "task_create",
            OperationKind::TaskUpdate => "task_update",
            OperationKind::ReservationCreate => "reservation_create",
            OperationKind::ReservationUpdate => "reservation_update",
            OperationKind::Unsupported(name) => name,
        }
    }

    /// Does this kind claim an exclusively-assignable resource?
    ///
    /// Claiming kinds go through the conflict checker before execution.
    pub fn claims_resource(&self) -> bool {
        matches!(
            self,
            OperationKind::AllocationCreate
                | OperationKind::AllocationUpdate
                | OperationKind::ReservationCreate
                | OperationKind::ReservationUpdate
        )
    }
}

/// Kinds are identified by name: a known name always yields its kind, so an
/// `Unsupported` record saved by an older build runs once this build knows it.
impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        OperationKind::SUPPORTED
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or(OperationKind::Unsupported(value))
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Unsupported(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
