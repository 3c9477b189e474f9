//! Domain model (ids, kinds, records, resource claims, errors).

pub mod errors;
pub mod ids;
pub mod kind;
pub mod payload;
pub mod record;
pub mod resource;
pub mod state;

pub use errors::{CacheError, ConfigError, ErrorKind, ExecuteError, StoreError};
pub use ids::{OperationId, ParseIdError};
pub use kind::OperationKind;
pub use record::OperationRecord;
pub use resource::{ClaimRef, ConflictReason, ResourceClaims};
pub use state::OperationStatus;
