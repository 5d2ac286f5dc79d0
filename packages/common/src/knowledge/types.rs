#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::IndexError;
use crate::storage::{ContentHash, StorageId};

/// Largest page a single `list` call may request.
pub const MAX_PAGE_SIZE: u64 = 100;
/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = IndexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| IndexError::InvalidId(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a knowledge entry. Time ordered, doubles as list cursor.
    EntryId
);
uuid_id!(
    /// Identifier of a tenant namespace inside the index.
    NamespaceId
);

/// A tenant's partition of the knowledge index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    pub id: NamespaceId,
    /// The tenant id the namespace was created for.
    pub key: String,
}

/// Ingestion lifecycle of an entry, owned by the index.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Text accepted, not yet segmented for retrieval.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    /// Text segmented and searchable.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ready"))]
    Ready,
    /// Ingestion gave up on this entry.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "failed"))]
    Failed,
}

/// Record attached to every entry this service registers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Blob holding the original upload. Absent for entries without a file.
    #[serde(default)]
    pub storage_id: Option<StorageId>,
    /// Tenant that uploaded the entry; the ownership key for reads and deletes.
    pub uploaded_by: String,
    pub filename: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl EntryMetadata {
    /// Decode a stored metadata record, rejecting anything that does not
    /// match the expected shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, IndexError> {
        let metadata: Self = serde_json::from_value(value)
            .map_err(|e| IndexError::InvalidMetadata(e.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "storage_id": self.storage_id,
            "uploaded_by": self.uploaded_by,
            "filename": self.filename,
            "category": self.category,
        })
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.uploaded_by.trim().is_empty() {
            return Err(IndexError::InvalidMetadata(
                "uploaded_by must not be empty".into(),
            ));
        }
        if self.filename.trim().is_empty() {
            return Err(IndexError::InvalidMetadata(
                "filename must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// An entry as reported by the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub namespace_id: NamespaceId,
    /// Human-readable handle, usually the original filename. Not unique.
    pub key: String,
    pub title: String,
    pub content_hash: ContentHash,
    pub status: EntryStatus,
    pub metadata: EntryMetadata,
    pub created_at: DateTime<Utc>,
}

/// Input to [`KnowledgeIndex::add`](super::KnowledgeIndex::add).
#[derive(Clone, Debug)]
pub struct NewEntry {
    /// Namespace key (tenant id). Created on first use.
    pub namespace: String,
    pub key: String,
    pub title: String,
    pub text: String,
    pub content_hash: ContentHash,
    pub metadata: EntryMetadata,
}

/// Result of registering an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOutcome {
    pub entry_id: EntryId,
    /// `false` when an entry with the same content hash already existed in
    /// the namespace; `entry_id` then names that existing entry.
    pub created: bool,
}

/// Cursor pagination request. The cursor is opaque to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOpts {
    pub num_items: u64,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Default for PaginationOpts {
    fn default() -> Self {
        Self {
            num_items: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}

impl PaginationOpts {
    /// Check the page size and decode the cursor.
    ///
    /// An absent or empty cursor means "from the start".
    pub fn start_after(&self) -> Result<Option<EntryId>, IndexError> {
        if self.num_items == 0 || self.num_items > MAX_PAGE_SIZE {
            return Err(IndexError::InvalidPageSize {
                requested: self.num_items,
                max: MAX_PAGE_SIZE,
            });
        }
        match self.cursor.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| IndexError::InvalidCursor(raw.to_string())),
        }
    }
}

/// One page of results plus the state needed to fetch the next one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: Vec<T>,
    pub is_done: bool,
    pub continue_cursor: String,
}

impl<T> Page<T> {
    /// The page returned for a namespace that does not exist yet.
    pub fn empty() -> Self {
        Self {
            page: Vec::new(),
            is_done: true,
            continue_cursor: String::new(),
        }
    }

    /// Build a page from a query that fetched up to `num_items + 1` rows.
    ///
    /// The extra row only signals that more results exist and is dropped.
    pub fn from_overfetch(
        mut items: Vec<T>,
        num_items: usize,
        previous_cursor: Option<&str>,
        cursor_of: impl Fn(&T) -> String,
    ) -> Self {
        let is_done = items.len() <= num_items;
        items.truncate(num_items);
        let continue_cursor = items
            .last()
            .map(cursor_of)
            .or_else(|| previous_cursor.map(str::to_string))
            .unwrap_or_default();
        Self {
            page: items,
            is_done,
            continue_cursor,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page.into_iter().map(f).collect(),
            is_done: self.is_done,
            continue_cursor: self.continue_cursor,
        }
    }
}
