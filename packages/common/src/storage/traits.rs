use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;
use super::id::StorageId;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Facts recorded about a blob when it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub size: u64,
    pub content_type: String,
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
}

/// Id-addressed blob storage.
///
/// Every `store` call produces a new blob, even for bytes that are already
/// stored under another id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under the given MIME type and return the new blob's id.
    async fn store(&self, data: &[u8], content_type: &str) -> Result<StorageId, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, id: &StorageId) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(id).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, id: &StorageId) -> Result<BoxReader, StorageError>;

    /// Look up a blob's metadata. `None` if the blob does not exist.
    async fn metadata(&self, id: &StorageId) -> Result<Option<BlobMetadata>, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, id: &StorageId) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, id: &StorageId) -> Result<bool, StorageError>;
}
