pub mod knowledge_chunk;
pub mod knowledge_entry;
pub mod namespace;
