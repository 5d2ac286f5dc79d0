use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque identifier of a stored blob.
///
/// Unlike [`ContentHash`](super::ContentHash), two uploads of identical bytes
/// receive distinct ids, so each upload owns its blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(Uuid);

impl StorageId {
    /// Allocate a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Two hex characters taken from the random tail of the id, used as the
    /// directory shard.
    pub fn shard(&self) -> String {
        hex::encode(&self.0.as_bytes()[15..])
    }
}

impl From<Uuid> for StorageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for StorageId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| StorageError::InvalidId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
