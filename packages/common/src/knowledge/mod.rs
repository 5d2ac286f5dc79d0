mod error;
mod traits;
mod types;

pub mod memory;

pub use error::IndexError;
pub use traits::KnowledgeIndex;
pub use types::{
    AddOutcome, DEFAULT_PAGE_SIZE, Entry, EntryId, EntryMetadata, EntryStatus, MAX_PAGE_SIZE,
    Namespace, NamespaceId, NewEntry, Page, PaginationOpts,
};
