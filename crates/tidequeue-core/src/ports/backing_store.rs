//! BackingStore port: the persistent store operations are replayed into.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ResourceClaims, StoreError};

/// The remote store the queue commits operations to.
///
/// Every mutation returns the created/updated entity. Any error is treated as
/// transient by the queue and retried under the retry policy.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn create_allocation(&self, data: Value) -> Result<Value, StoreError>;

    async fn update_allocation(&self, id: &str, data: Value) -> Result<Value, StoreError>;

    async fn create_bill(&self, data: Value) -> Result<Value, StoreError>;

    async fn create_payment(&self, data: Value) -> Result<Value, StoreError>;

    async fn mark_bill_paid(&self, bill_id: &str) -> Result<Value, StoreError>;

    async fn create_task(&self, data: Value) -> Result<Value, StoreError>;

    async fn update_task(&self, id: &str, data: Value) -> Result<Value, StoreError>;

    async fn create_reservation(&self, data: Value) -> Result<Value, StoreError>;

    async fn update_reservation(&self, id: &str, data: Value) -> Result<Value, StoreError>;

    /// Resource plus the claims active right now (used by the conflict check).
    async fn get_resource_with_active_claims(
        &self,
        resource_id: &str,
    ) -> Result<ResourceClaims, StoreError>;
}
