use async_trait::async_trait;

use super::error::IndexError;
use super::types::{
    AddOutcome, Entry, EntryId, Namespace, NamespaceId, NewEntry, Page, PaginationOpts,
};

/// Tenant-partitioned store of text entries used for retrieval.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Look up a namespace by its key. `None` if nothing was ever added to it.
    async fn get_namespace(&self, key: &str) -> Result<Option<Namespace>, IndexError>;

    /// Register an entry, creating its namespace on first use.
    ///
    /// At most one entry survives per `(namespace, content_hash)`, even under
    /// concurrent callers; a duplicate reports the surviving entry with
    /// `created = false`.
    async fn add(&self, entry: NewEntry) -> Result<AddOutcome, IndexError>;

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, IndexError>;

    /// Remove an entry. Secondary cleanup may complete after this returns.
    async fn delete_entry(&self, id: EntryId) -> Result<(), IndexError>;

    /// Fetch one page of a namespace's entries in id order.
    async fn list(
        &self,
        namespace_id: NamespaceId,
        opts: &PaginationOpts,
    ) -> Result<Page<Entry>, IndexError>;
}
