//! Payload shapes per operation kind.
//!
//! Payloads are opaque JSON to the queue; only the executor and the conflict
//! check look inside, through these accessors.
//! - create kinds: the field object (claiming kinds carry `resource_id`)
//! - update kinds: `{ "id": <entity id>, "data": { ...fields } }`
//! - payment: the field object, carrying `bill_id`

use serde_json::{Map, Value};

use super::errors::ExecuteError;
use super::kind::OperationKind;

pub const RESOURCE_ID: &str = "resource_id";
pub const BILL_ID: &str = "bill_id";

/// Target of an update kind.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTarget {
    pub id: String,
    pub data: Map<String, Value>,
}

/// Entity ids may arrive as strings or numbers.
fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The resource a claiming kind wants to hold.
///
/// Create kinds must name one. Updates only name one when they move the
/// claim to another resource; otherwise there is nothing to check.
pub fn claimed_resource(kind: &OperationKind, payload: &Value) -> Result<Option<String>, ExecuteError> {
    match kind {
        OperationKind::AllocationCreate | OperationKind::ReservationCreate => payload
            .get(RESOURCE_ID)
            .and_then(id_value)
            .map(Some)
            .ok_or_else(|| ExecuteError::invalid_payload(kind, "missing resource_id")),
        OperationKind::AllocationUpdate | OperationKind::ReservationUpdate => Ok(payload
            .get("data")
            .and_then(|data| data.get(RESOURCE_ID))
            .and_then(id_value)),
        _ => Ok(None),
    }
}

/// Field object of a create kind.
pub fn create_fields(kind: &OperationKind, payload: &Value) -> Result<Map<String, Value>, ExecuteError> {
    payload
        .as_object()
        .cloned()
        .ok_or_else(|| ExecuteError::invalid_payload(kind, "payload must be an object"))
}

/// Entity id and field object of an update kind.
pub fn update_target(kind: &OperationKind, payload: &Value) -> Result<UpdateTarget, ExecuteError> {
    let id = payload
        .get("id")
        .and_then(id_value)
        .ok_or_else(|| ExecuteError::invalid_payload(kind, "missing id"))?;
    let data = payload
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| ExecuteError::invalid_payload(kind, "missing data object"))?;
    Ok(UpdateTarget { id, data })
}

/// Bill settled by a payment.
pub fn bill_id(kind: &OperationKind, payload: &Value) -> Result<String, ExecuteError> {
    payload
        .get(BILL_ID)
        .and_then(id_value)
        .ok_or_else(|| ExecuteError::invalid_payload(kind, "missing bill_id"))
}
