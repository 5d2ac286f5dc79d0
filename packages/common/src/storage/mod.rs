mod error;
mod hash;
mod id;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use hash::ContentHash;
pub use id::StorageId;
pub use traits::{BlobMetadata, BlobStore, BoxReader};
