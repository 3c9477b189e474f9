//! Operation identifiers.
//!
//! IDs are ULIDs rendered with an `op-` prefix:
//! - **time-sortable**: the timestamp comes first, so generation order is preserved
//! - **collision-free**: no coordination needed between producers
//! - serialized as a plain string so a persisted queue stays readable

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier of an Operation Record, assigned at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationId(Ulid);

impl OperationId {
    /// Display prefix.
    pub const PREFIX: &'static str = "op-";

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for OperationId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation id: {0:?}")]
pub struct ParseIdError(String);

impl FromStr for OperationId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| ParseIdError(s.to_string()))?;
        Ulid::from_string(raw)
            .map(Self)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl TryFrom<String> for OperationId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OperationId> for String {
    fn from(id: OperationId) -> Self {
        id.to_string()
    }
}
