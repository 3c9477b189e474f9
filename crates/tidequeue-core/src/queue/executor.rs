//! Operation Executor: one backing-store call per operation kind.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::domain::payload::{self, UpdateTarget};
use crate::domain::{ExecuteError, OperationKind};
use crate::ports::{BackingStore, Clock};

/// Default `status` stamped on create kinds that have one.
fn default_status(kind: &OperationKind) -> Option<&'static str> {
    match kind {
        OperationKind::AllocationCreate => Some("active"),
        OperationKind::ReservationCreate => Some("confirmed"),
        OperationKind::BillCreate | OperationKind::TaskCreate => Some("pending"),
        _ => None,
    }
}

fn timestamp(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Fill in fields producers are not required to supply. Supplied values win.
fn stamp_create(kind: &OperationKind, mut data: Map<String, Value>, now: DateTime<Utc>) -> Value {
    if let Some(status) = default_status(kind) {
        data.entry("status").or_insert_with(|| Value::from(status));
    }
    data.entry("created_at").or_insert_with(|| timestamp(now));
    data.entry("updated_at").or_insert_with(|| timestamp(now));
    Value::Object(data)
}

fn stamp_update(mut data: Map<String, Value>, now: DateTime<Utc>) -> Value {
    data.entry("updated_at").or_insert_with(|| timestamp(now));
    Value::Object(data)
}

/// Translates an operation into backing-store mutations.
///
/// Dispatch is an exhaustive match on [`OperationKind`]; an `Unsupported`
/// kind fails permanently.
pub struct OperationExecutor {
    store: Arc<dyn BackingStore>,
    clock: Arc<dyn Clock>,
}

impl OperationExecutor {
    pub fn new(store: Arc<dyn BackingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Execute one operation and return the entity the store produced.
    ///
    /// `PaymentApply` performs two mutations (payment, then bill paid). If the
    /// second fails the whole operation fails; there is no partial success.
    pub async fn execute(&self, kind: &OperationKind, payload: &Value) -> Result<Value, ExecuteError> {
        let now = self.clock.now();
        let entity = match kind {
            OperationKind::AllocationCreate => {
                let data = stamp_create(kind, payload::create_fields(kind, payload)?, now);
                self.store.create_allocation(data).await?
            }
            OperationKind::AllocationUpdate => {
                let UpdateTarget { id, data } = payload::update_target(kind, payload)?;
                self.store.update_allocation(&id, stamp_update(data, now)).await?
            }
            OperationKind::BillCreate => {
                let data = stamp_create(kind, payload::create_fields(kind, payload)?, now);
                self.store.create_bill(data).await?
            }
            OperationKind::PaymentApply => {
                let bill_id = payload::bill_id(kind, payload)?;
                let mut data = payload::create_fields(kind, payload)?;
                data.entry("created_at").or_insert_with(|| timestamp(now));
                let payment = self.store.create_payment(Value::Object(data)).await?;
                self.store.mark_bill_paid(&bill_id).await?;
                payment
            }
            OperationKind::TaskCreate => {
                let data = stamp_create(kind, payload::create_fields(kind, payload)?, now);
                self.store.create_task(data).await?
            }
            OperationKind::TaskUpdate => {
                let UpdateTarget { id, data } = payload::update_target(kind, payload)?;
                self.store.update_task(&id, stamp_update(data, now)).await?
            }
            OperationKind::ReservationCreate => {
                let data = stamp_create(kind, payload::create_fields(kind, payload)?, now);
                self.store.create_reservation(data).await?
            }
            OperationKind::ReservationUpdate => {
                let UpdateTarget { id, data } = payload::update_target(kind, payload)?;
                self.store.update_reservation(&id, stamp_update(data, now)).await?
            }
            OperationKind::Unsupported(name) => {
                return Err(ExecuteError::UnsupportedOperation(name.clone()));
            }
        };
        Ok(entity)
    }
}
