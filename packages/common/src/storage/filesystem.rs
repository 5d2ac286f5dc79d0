use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::hash::ContentHash;
use super::id::StorageId;
use super::traits::{BlobMetadata, BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{shard}/{id}` with the metadata sidecar next to it at
/// `{base_path}/{shard}/{id}.json`.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given blob.
    fn blob_path(&self, id: &StorageId) -> PathBuf {
        self.base_path.join(id.shard()).join(id.to_string())
    }

    fn metadata_path(&self, id: &StorageId) -> PathBuf {
        self.base_path.join(id.shard()).join(format!("{id}.json"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Write `data` to `target` through a temp file and an atomic rename.
    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn store(&self, data: &[u8], content_type: &str) -> Result<StorageId, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let id = StorageId::generate();
        let metadata = BlobMetadata {
            size: data.len() as u64,
            content_type: content_type.to_string(),
            content_hash: ContentHash::compute(data),
            created_at: Utc::now(),
        };

        // Sidecar first: a blob without metadata is never visible.
        let sidecar = serde_json::to_vec(&metadata)?;
        self.write_atomic(&self.metadata_path(&id), &sidecar).await?;
        if let Err(e) = self.write_atomic(&self.blob_path(&id), data).await {
            let _ = fs::remove_file(self.metadata_path(&id)).await;
            return Err(e);
        }

        Ok(id)
    }

    async fn get_stream(&self, id: &StorageId) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(id)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn metadata(&self, id: &StorageId) -> Result<Option<BlobMetadata>, StorageError> {
        if !fs::try_exists(self.blob_path(id)).await? {
            return Ok(None);
        }
        match fs::read(self.metadata_path(id)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &StorageId) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(id)).await?)
    }

    async fn delete(&self, id: &StorageId) -> Result<bool, StorageError> {
        let deleted = match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(self.metadata_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(deleted)
    }
}
