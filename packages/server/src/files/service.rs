use std::sync::Arc;

use common::knowledge::{
    Entry, EntryId, EntryMetadata, KnowledgeIndex, NewEntry, Page, PaginationOpts,
};
use common::storage::{BlobStore, ContentHash, StorageId};
use tracing::{debug, error, info, instrument, warn};

use super::error::FileError;
use super::mime::effective_mime_type;
use super::projection::{file_status, file_type, format_file_size};
use crate::extract::{ExtractRequest, TextExtractor};
use crate::extractors::auth::RequestContext;
use crate::models::file::PublicFile;
use crate::utils::filename::validate_upload_filename;

/// An upload as received from the dashboard.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub category: Option<String>,
}

/// Result of registering an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedFile {
    pub url: Option<String>,
    pub entry_id: EntryId,
    pub created: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ListFiles {
    pub category: Option<String>,
    pub pagination: PaginationOpts,
}

/// Knowledge-file workflows: ingestion with deduplication, listing, deletion.
///
/// Each call runs its steps strictly in sequence. Only the index decides
/// whether an upload is a duplicate.
#[derive(Clone)]
pub struct FileService {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn KnowledgeIndex>,
    extractor: Arc<dyn TextExtractor>,
    public_url: String,
}

impl FileService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn KnowledgeIndex>,
        extractor: Arc<dyn TextExtractor>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            index,
            extractor,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Store an upload, register its text with the tenant's namespace, and
    /// drop the new blob again if the content was already registered.
    #[instrument(skip(self, ctx, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn add_file(
        &self,
        ctx: &RequestContext,
        upload: FileUpload,
    ) -> Result<AddedFile, FileError> {
        let tenant = ctx.resolve_tenant()?;

        let filename = validate_upload_filename(&upload.filename)
            .map_err(|e| FileError::Validation(e.message().into()))?
            .to_string();
        let category = upload
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let mime_type = effective_mime_type(upload.mime_type.as_deref(), &filename, &upload.bytes)
            .map_err(|e| FileError::Validation(format!("Invalid MIME type: {e}")))?;

        let storage_id = self.blobs.store(&upload.bytes, &mime_type).await?;

        let text = match self
            .extractor
            .extract(ExtractRequest {
                storage_id: &storage_id,
                filename: &filename,
                bytes: &upload.bytes,
                mime_type: &mime_type,
            })
            .await
        {
            Ok(text) => text,
            Err(e) => {
                self.discard_blob(&storage_id, "extraction failed").await;
                return Err(e.into());
            }
        };

        let outcome = self
            .index
            .add(NewEntry {
                namespace: tenant.id.clone(),
                key: filename.clone(),
                title: filename.clone(),
                text,
                content_hash: ContentHash::compute(&upload.bytes),
                metadata: EntryMetadata {
                    storage_id: Some(storage_id),
                    uploaded_by: tenant.id.clone(),
                    filename,
                    category,
                },
            })
            .await?;

        let url = if outcome.created {
            self.blob_url(&storage_id).await
        } else {
            debug!(
                entry_id = %outcome.entry_id,
                %storage_id,
                "Entry already exists, deleting duplicate storage file"
            );
            self.discard_blob(&storage_id, "duplicate upload").await;
            self.entry_url(outcome.entry_id).await
        };

        info!(
            tenant = %tenant.id,
            entry_id = %outcome.entry_id,
            created = outcome.created,
            %mime_type,
            "Knowledge file registered"
        );

        Ok(AddedFile {
            url,
            entry_id: outcome.entry_id,
            created: outcome.created,
        })
    }

    /// Delete an entry owned by the caller's tenant, together with its blob.
    #[instrument(skip(self, ctx), fields(%entry_id))]
    pub async fn delete_file(&self, ctx: &RequestContext, entry_id: EntryId) -> Result<(), FileError> {
        let tenant = ctx.resolve_tenant()?;

        let namespace = self
            .index
            .get_namespace(&tenant.id)
            .await?
            .ok_or(FileError::Unauthorized("Invalid namespace"))?;

        let entry = self
            .index
            .get_entry(entry_id)
            .await?
            .ok_or(FileError::NotFound("Entry not found"))?;

        if entry.metadata.uploaded_by != tenant.id || entry.namespace_id != namespace.id {
            warn!(tenant = %tenant.id, "Rejected delete of another organization's entry");
            return Err(FileError::Unauthorized("Invalid Organization ID"));
        }

        if let Some(storage_id) = entry.metadata.storage_id {
            self.discard_blob(&storage_id, "entry deleted").await;
        }

        self.index.delete_entry(entry_id).await?;
        info!(tenant = %tenant.id, "Knowledge file deleted");
        Ok(())
    }

    /// One page of the tenant's files, optionally narrowed to a category.
    ///
    /// The category filter runs on the fetched page, so a filtered page can
    /// hold fewer than `num_items` files while `is_done` is still false.
    #[instrument(skip(self, ctx, query), fields(category = ?query.category))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: ListFiles,
    ) -> Result<Page<PublicFile>, FileError> {
        let tenant = ctx.resolve_tenant()?;

        let Some(namespace) = self.index.get_namespace(&tenant.id).await? else {
            return Ok(Page::empty());
        };

        let results = self.index.list(namespace.id, &query.pagination).await?;

        let mut files = Vec::with_capacity(results.page.len());
        for entry in results.page {
            files.push(self.to_public_file(entry).await);
        }

        // Stored categories are trimmed on upload; match them the same way.
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(category) = category {
            files.retain(|f| f.category.as_deref() == Some(category));
        }

        Ok(Page {
            page: files,
            is_done: results.is_done,
            continue_cursor: results.continue_cursor,
        })
    }

    async fn to_public_file(&self, entry: Entry) -> PublicFile {
        let storage_id = entry.metadata.storage_id;

        let size = match storage_id {
            Some(id) => match self.blobs.metadata(&id).await {
                Ok(Some(meta)) => format_file_size(meta.size),
                Ok(None) => "unknown".to_string(),
                Err(e) => {
                    error!(entry_id = %entry.id, storage_id = %id, error = %e, "Failed to get storage metadata");
                    "unknown".to_string()
                }
            },
            None => "unknown".to_string(),
        };

        let url = match storage_id {
            Some(id) => self.blob_url(&id).await,
            None => None,
        };

        PublicFile {
            id: entry.id.to_string(),
            file_type: file_type(&entry.key),
            name: entry.key,
            size,
            status: file_status(entry.status),
            url,
            category: entry.metadata.category.filter(|c| !c.is_empty()),
        }
    }

    /// Public download URL of a blob, if it still exists.
    pub async fn blob_url(&self, storage_id: &StorageId) -> Option<String> {
        match self.blobs.exists(storage_id).await {
            Ok(true) => Some(format!("{}/api/v1/storage/{storage_id}", self.public_url)),
            Ok(false) => None,
            Err(e) => {
                warn!(%storage_id, error = %e, "Failed to resolve storage URL");
                None
            }
        }
    }

    /// URL of the blob behind an existing entry.
    async fn entry_url(&self, entry_id: EntryId) -> Option<String> {
        match self.index.get_entry(entry_id).await {
            Ok(Some(entry)) => match entry.metadata.storage_id {
                Some(id) => self.blob_url(&id).await,
                None => None,
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%entry_id, error = %e, "Failed to load matched entry");
                None
            }
        }
    }

    /// Best-effort blob removal. Failures are logged, never returned.
    async fn discard_blob(&self, storage_id: &StorageId, reason: &str) {
        if let Err(e) = self.blobs.delete(storage_id).await {
            warn!(%storage_id, reason, error = %e, "Failed to delete storage file");
        }
    }
}
