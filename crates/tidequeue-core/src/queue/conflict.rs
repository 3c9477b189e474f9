//! Conflict Checker: guards claims on exclusively-assignable resources.

use std::sync::Arc;

use crate::domain::{ConflictReason, ResourceClaims, StoreError};
use crate::ports::BackingStore;

/// First conflict found in `claims`, in precedence order:
/// not found, unavailable, active contract, active booking.
pub fn first_conflict(claims: &ResourceClaims) -> Option<ConflictReason> {
    if !claims.exists {
        Some(ConflictReason::NotFound)
    } else if !claims.is_available {
        Some(ConflictReason::Unavailable)
    } else if !claims.active_long_term_claims.is_empty() {
        Some(ConflictReason::ActiveContract)
    } else if !claims.active_short_term_claims_overlapping_now.is_empty() {
        Some(ConflictReason::ActiveBooking)
    } else {
        None
    }
}

pub struct ConflictChecker {
    store: Arc<dyn BackingStore>,
}

impl ConflictChecker {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store }
    }

    /// Would claiming `resource_id` now violate exclusivity?
    ///
    /// A lookup failure is returned as an error, not as a conflict: the
    /// caller treats it as a transient fault.
    pub async fn check_conflict(
        &self,
        resource_id: &str,
    ) -> Result<Option<ConflictReason>, StoreError> {
        let claims = self.store.get_resource_with_active_claims(resource_id).await?;
        let conflict = first_conflict(&claims);
        if let Some(reason) = conflict {
            tracing::debug!(resource_id, %reason, "resource conflict");
        }
        Ok(conflict)
    }
}
