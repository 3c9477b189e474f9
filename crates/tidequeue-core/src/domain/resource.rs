//! Resource claims and conflict reasons.
//!
//! A resource (a berth, for example) is an exclusively-assignable slot: at
//! most one active claim may hold it at a time. Long-term claims are
//! contract-like allocations; short-term claims are bookings with a date range.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A claim currently holding a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl ClaimRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            starts_at: None,
            ends_at: None,
        }
    }
}

/// A resource together with the claims active right now.
///
/// Returned by the backing store; the store filters bookings down to the ones
/// whose date range contains "now".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceClaims {
    pub exists: bool,
    pub is_available: bool,
    pub active_long_term_claims: Vec<ClaimRef>,
    pub active_short_term_claims_overlapping_now: Vec<ClaimRef>,
}

impl ResourceClaims {
    /// The resource does not exist.
    pub fn missing() -> Self {
        Self::default()
    }

    /// An existing, available resource with no claims.
    pub fn free() -> Self {
        Self {
            exists: true,
            is_available: true,
            ..Self::default()
        }
    }
}

/// Why a claim on a resource cannot be committed.
///
/// Variants are listed in precedence order: when several apply, the first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    NotFound,
    Unavailable,
    ActiveContract,
    ActiveBooking,
}

impl ConflictReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictReason::NotFound => "not found",
            ConflictReason::Unavailable => "unavailable",
            ConflictReason::ActiveContract => "has active contract",
            ConflictReason::ActiveBooking => "has active booking",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
