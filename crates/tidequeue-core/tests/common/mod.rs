//! Shared doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tidequeue_core::QueueManager;
use tidequeue_core::domain::{CacheError, ClaimRef, ResourceClaims, StoreError};
use tidequeue_core::impls::InMemoryCache;
use tidequeue_core::ports::{BackingStore, DurableCache};
use tokio::sync::Semaphore;

pub const LOOKUP: &str = "get_resource_with_active_claims";

/// One call received by [`MockStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub id: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Always,
    Times(u32),
}

/// Backing store that records every call and fails on demand.
///
/// Resources default to "does not exist"; register them with
/// [`MockStore::set_resource`]. A committed allocation on a registered
/// resource becomes an active contract on it. Mutations can be held behind a
/// gate to observe the queue mid-attempt.
#[derive(Default)]
pub struct MockStore {
    calls: Mutex<Vec<Call>>,
    resources: Mutex<HashMap<String, ResourceClaims>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    next_id: AtomicU64,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_resource(&self, id: &str, claims: ResourceClaims) {
        self.resources.lock().unwrap().insert(id.to_string(), claims);
    }

    pub fn free_resource(&self, id: &str) {
        self.set_resource(id, ResourceClaims::free());
    }

    pub fn contracted_resource(&self, id: &str) {
        self.set_resource(
            id,
            ResourceClaims {
                active_long_term_claims: vec![ClaimRef::new("contract-1")],
                ..ResourceClaims::free()
            },
        );
    }

    pub fn fail(&self, method: &'static str, failure: Failure) {
        self.failures.lock().unwrap().insert(method, failure);
    }

    /// Hold every following mutation until the returned semaphore gets a
    /// permit (one permit releases one call).
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }

    pub fn claims_on(&self, resource_id: &str) -> ResourceClaims {
        let resources = self.resources.lock().unwrap();
        resources.get(resource_id).cloned().unwrap_or_default()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    fn should_fail(&self, method: &'static str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(method) {
            Some(Failure::Always) => true,
            Some(Failure::Times(n)) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    async fn call(&self, method: &'static str, id: Option<&str>, data: Value) -> Result<Value, StoreError> {
        self.calls.lock().unwrap().push(Call {
            method,
            id: id.map(str::to_string),
            data: data.clone(),
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.should_fail(method) {
            return Err(StoreError::Unavailable(format!("{method} failed")));
        }

        let mut entity = match data {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        let id = match id {
            Some(id) => id.to_string(),
            None => format!("mock-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
        };
        entity.insert("id".to_string(), Value::String(id));
        Ok(Value::Object(entity))
    }
}

#[async_trait]
impl BackingStore for MockStore {
    async fn create_allocation(&self, data: Value) -> Result<Value, StoreError> {
        let entity = self.call("create_allocation", None, data).await?;
        if let (Some(resource_id), Some(id)) = (
            entity.get("resource_id").and_then(Value::as_str),
            entity.get("id").and_then(Value::as_str),
        ) {
            let mut resources = self.resources.lock().unwrap();
            if let Some(claims) = resources.get_mut(resource_id) {
                claims.active_long_term_claims.push(ClaimRef::new(id));
            }
        }
        Ok(entity)
    }

    async fn update_allocation(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.call("update_allocation", Some(id), data).await
    }

    async fn create_bill(&self, data: Value) -> Result<Value, StoreError> {
        self.call("create_bill", None, data).await
    }

    async fn create_payment(&self, data: Value) -> Result<Value, StoreError> {
        self.call("create_payment", None, data).await
    }

    async fn mark_bill_paid(&self, bill_id: &str) -> Result<Value, StoreError> {
        self.call("mark_bill_paid", Some(bill_id), Value::Null).await
    }

    async fn create_task(&self, data: Value) -> Result<Value, StoreError> {
        self.call("create_task", None, data).await
    }

    async fn update_task(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.call("update_task", Some(id), data).await
    }

    async fn create_reservation(&self, data: Value) -> Result<Value, StoreError> {
        self.call("create_reservation", None, data).await
    }

    async fn update_reservation(&self, id: &str, data: Value) -> Result<Value, StoreError> {
        self.call("update_reservation", Some(id), data).await
    }

    async fn get_resource_with_active_claims(&self, resource_id: &str) -> Result<ResourceClaims, StoreError> {
        self.calls.lock().unwrap().push(Call {
            method: LOOKUP,
            id: Some(resource_id.to_string()),
            data: Value::Null,
        });
        if self.should_fail(LOOKUP) {
            return Err(StoreError::Unavailable("lookup failed".to_string()));
        }
        let resources = self.resources.lock().unwrap();
        Ok(resources.get(resource_id).cloned().unwrap_or_default())
    }
}

/// In-memory cache whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyCache {
    inner: InMemoryCache,
    fail_writes: AtomicBool,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DurableCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("disk full".to_string()));
        }
        self.inner.set(key, blob).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("disk full".to_string()));
        }
        self.inner.remove(key).await
    }
}

/// Manager over `store` with retries driven by drains only.
pub async fn manual_manager(store: Arc<MockStore>) -> QueueManager {
    QueueManager::builder(store, Arc::new(InMemoryCache::new()))
        .scheduled_retries(false)
        .build()
        .await
        .unwrap()
}

/// Manager over `store` with scheduled retries every `base_delay * n`.
pub async fn scheduled_manager(store: Arc<MockStore>, base_delay: Duration) -> QueueManager {
    QueueManager::builder(store, Arc::new(InMemoryCache::new()))
        .retry_policy(tidequeue_core::RetryPolicy::new(3, base_delay).unwrap())
        .build()
        .await
        .unwrap()
}
