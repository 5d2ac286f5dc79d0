pub mod chunker;
mod index;
pub mod worker;

pub use index::SeaOrmKnowledgeIndex;
pub use worker::IndexingWorker;
