//! InMemoryBackingStore: a process-local stand-in for the remote store.
//!
//! Keeps entity tables as JSON objects and derives resource claims from them:
//! - long-term claims: allocations with `status: "active"` on the resource
//! - short-term claims: reservations on the resource, not cancelled, whose
//!   `starts_at..ends_at` range contains the clock's "now"

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::domain::{ClaimRef, ResourceClaims, StoreError};
use crate::ports::{BackingStore, Clock};

#[derive(Default)]
struct StoreState {
    /// resource id -> is_available
    resources: HashMap<String, bool>,
    allocations: Vec<Value>,
    bills: Vec<Value>,
    payments: Vec<Value>,
    tasks: Vec<Value>,
    reservations: Vec<Value>,
    next_id: u64,
}

fn id_matches(value: Option<&Value>, id: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn parse_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn claim_ref(entity: &Value) -> ClaimRef {
    let id = match entity.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    ClaimRef {
        id,
        starts_at: parse_time(entity.get("starts_at")),
        ends_at: parse_time(entity.get("ends_at")),
    }
}

impl StoreState {
    fn insert(&mut self, table: Table, data: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = data else {
            return Err(StoreError::Rejected(format!("{} must be an object", table.entity())));
        };
        if !fields.contains_key("id") {
            self.next_id += 1;
            fields.insert(
                "id".to_string(),
                Value::String(format!("{}-{}", table.entity(), self.next_id)),
            );
        }
        let entity = Value::Object(fields);
        self.table_mut(table).push(entity.clone());
        Ok(entity)
    }

    fn update(&mut self, table: Table, id: &str, data: Value) -> Result<Value, StoreError> {
        let Value::Object(fields) = data else {
            return Err(StoreError::Rejected(format!("{} update must be an object", table.entity())));
        };
        let entity = self
            .table_mut(table)
            .iter_mut()
            .find(|e| id_matches(e.get("id"), id))
            .ok_or_else(|| StoreError::NotFound {
                entity: table.entity().to_string(),
                id: id.to_string(),
            })?;
        if let Value::Object(existing) = &mut *entity {
            merge(existing, fields);
        }
        Ok(entity.clone())
    }

    fn table_mut(&mut self, table: Table) -> &mut Vec<Value> {
        match table {
            Table::Allocations => &mut self.allocations,
            Table::Bills => &mut self.bills,
            Table::Payments => &mut self.payments,
            Table::Tasks => &mut self.tasks,
            Table::Reservations => &mut self.reservations,
        }
    }
}

fn merge(existing: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        if key != "id" {
            existing.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Allocations,
    Bills,
    Payments,
    Tasks,
    Reservations,
}

impl Table {
    fn entity(self) -> &'static str {
        match self {
            Table::Allocations => "allocation",
            Table::Bills => "bill",
            Table::Payments => "payment",
            Table::Tasks => "task",
            Table::Reservations => "reservation",
        }
    }
}

/// In-memory [`BackingStore`].
pub struct InMemoryBackingStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackingStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Register (or update) a claimable resource.
    pub async fn add_resource(&self, id: impl Into<String>, is_available: bool) {
        self.state.lock().await.resources.insert(id.into(), is_available);
    }

    pub async fn allocations(&self) -> Vec<Value> {
        self.state.lock().await.allocations.clone()
    }

    pub async fn reservations(&self) -> Vec<Value> {
        self.state.lock().await.reservations.clone()
    }

    pub async fn tasks(&self) -> Vec<Value> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn payments(&self) -> Vec<Value> {
        self.state.lock().await.payments.clone()
    }

    pub async fn bill(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state.bills.iter().find(|b| id_matches(b.get("id"), id)).cloned()
    }
}

#[async_trait]
impl BackingStore for InMemoryBackingStore {
    async fn create_allocation(&self, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.insert(Table::Allocations, data)
    }

    async fn update_allocation(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.update(Table::Allocations, id, data)
    }

    async fn create_bill(&self, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.insert(Table::Bills, data)
    }

    async fn create_payment(&self, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.insert(Table::Payments, data)
    }

    async fn mark_bill_paid(&self, bill_id: &str) -> Result<Value, StoreError> {
        let paid_at = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut fields = Map::new();
        fields.insert("status".to_string(), Value::from("paid"));
        fields.insert("paid_at".to_string(), Value::String(paid_at));
        self.state
            .lock()
            .await
            .update(Table::Bills, bill_id, Value::Object(fields))
    }

    async fn create_task(&self, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.insert(Table::Tasks, data)
    }

    async fn update_task(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.update(Table::Tasks, id, data)
    }

    async fn create_reservation(&self, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.insert(Table::Reservations, data)
    }

    async fn update_reservation(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.state.lock().await.update(Table::Reservations, id, data)
    }

    async fn get_resource_with_active_claims(
        &self,
        resource_id: &str,
    ) -> Result<ResourceClaims, StoreError> {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let Some(&is_available) = state.resources.get(resource_id) else {
            return Ok(ResourceClaims::missing());
        };

        let active_long_term_claims = state
            .allocations
            .iter()
            .filter(|a| id_matches(a.get("resource_id"), resource_id))
            .filter(|a| a.get("status").and_then(Value::as_str) == Some("active"))
            .map(claim_ref)
            .collect();

        let active_short_term_claims_overlapping_now = state
            .reservations
            .iter()
            .filter(|r| id_matches(r.get("resource_id"), resource_id))
            .filter(|r| r.get("status").and_then(Value::as_str) != Some("cancelled"))
            .map(claim_ref)
            .filter(|c| c.starts_at.is_none_or(|start| start <= now))
            .filter(|c| c.ends_at.is_none_or(|end| now < end))
            .collect();

        Ok(ResourceClaims {
            exists: true,
            is_available,
            active_long_term_claims,
            active_short_term_claims_overlapping_now,
        })
    }
}
