use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::error::IndexError;
use super::traits::KnowledgeIndex;
use super::types::{
    AddOutcome, Entry, EntryId, EntryStatus, Namespace, NamespaceId, NewEntry, Page,
    PaginationOpts,
};

#[derive(Default)]
struct State {
    namespaces: HashMap<String, Namespace>,
    /// Ordered by id so listing walks entries in creation order.
    entries: BTreeMap<EntryId, Entry>,
    texts: HashMap<EntryId, String>,
}

/// Knowledge index held entirely in process memory.
///
/// A single lock serialises writers, which is what makes the
/// one-entry-per-content-hash guarantee hold under concurrency.
#[derive(Default)]
pub struct MemoryKnowledgeIndex {
    state: Mutex<State>,
}

impl MemoryKnowledgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text registered for an entry.
    pub async fn text(&self, id: EntryId) -> Option<String> {
        self.state.lock().await.texts.get(&id).cloned()
    }

    /// Advance every pending entry to `ready`, as a finished ingestion pass would.
    pub async fn mark_all_ready(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut advanced = 0;
        for entry in state.entries.values_mut() {
            if entry.status == EntryStatus::Pending {
                entry.status = EntryStatus::Ready;
                advanced += 1;
            }
        }
        advanced
    }

    /// Force an entry into a given status.
    pub async fn set_status(&self, id: EntryId, status: EntryStatus) -> bool {
        match self.state.lock().await.entries.get_mut(&id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KnowledgeIndex for MemoryKnowledgeIndex {
    async fn get_namespace(&self, key: &str) -> Result<Option<Namespace>, IndexError> {
        Ok(self.state.lock().await.namespaces.get(key).cloned())
    }

    async fn add(&self, new: NewEntry) -> Result<AddOutcome, IndexError> {
        new.metadata.validate()?;

        let mut state = self.state.lock().await;
        let namespace_id = state
            .namespaces
            .entry(new.namespace.clone())
            .or_insert_with(|| Namespace {
                id: NamespaceId::generate(),
                key: new.namespace.clone(),
            })
            .id;

        if let Some(existing) = state
            .entries
            .values()
            .find(|e| e.namespace_id == namespace_id && e.content_hash == new.content_hash)
        {
            return Ok(AddOutcome {
                entry_id: existing.id,
                created: false,
            });
        }

        let id = EntryId::generate();
        state.entries.insert(
            id,
            Entry {
                id,
                namespace_id,
                key: new.key,
                title: new.title,
                content_hash: new.content_hash,
                status: EntryStatus::Pending,
                metadata: new.metadata,
                created_at: Utc::now(),
            },
        );
        state.texts.insert(id, new.text);

        Ok(AddOutcome {
            entry_id: id,
            created: true,
        })
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, IndexError> {
        Ok(self.state.lock().await.entries.get(&id).cloned())
    }

    async fn delete_entry(&self, id: EntryId) -> Result<(), IndexError> {
        let mut state = self.state.lock().await;
        state.entries.remove(&id);
        state.texts.remove(&id);
        Ok(())
    }

    async fn list(
        &self,
        namespace_id: NamespaceId,
        opts: &PaginationOpts,
    ) -> Result<Page<Entry>, IndexError> {
        let start_after = opts.start_after()?;
        let limit = opts.num_items as usize;

        let state = self.state.lock().await;
        let items: Vec<Entry> = state
            .entries
            .values()
            .filter(|e| e.namespace_id == namespace_id)
            .filter(|e| start_after.is_none_or(|after| e.id > after))
            .take(limit + 1)
            .cloned()
            .collect();

        Ok(Page::from_overfetch(
            items,
            limit,
            opts.cursor.as_deref(),
            |e| e.id.to_string(),
        ))
    }
}
