use async_trait::async_trait;
use common::storage::StorageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Cannot extract text from content type '{0}'")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Everything known about an upload at extraction time.
#[derive(Clone, Copy, Debug)]
pub struct ExtractRequest<'a> {
    pub storage_id: &'a StorageId,
    pub filename: &'a str,
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

/// Turns uploaded bytes into the plain text registered with the index.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, request: ExtractRequest<'_>) -> Result<String, ExtractError>;
}

/// Extracts text from textual formats and PDF documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentExtractor;

const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-yaml",
    "application/yaml",
    "application/x-sh",
    "application/sql",
    "application/csv",
];

/// Whether a MIME type can be read as UTF-8 text as-is.
pub fn is_textual(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || TEXTUAL_APPLICATION_TYPES.contains(&essence)
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, request: ExtractRequest<'_>) -> Result<String, ExtractError> {
        if is_textual(request.mime_type) {
            return Ok(String::from_utf8_lossy(request.bytes).into_owned());
        }

        if request.mime_type == "application/pdf" {
            let bytes = request.bytes.to_vec();
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
            })
            .await?
            .map_err(ExtractError::Pdf)?;
            tracing::debug!(
                storage_id = %request.storage_id,
                filename = request.filename,
                chars = text.len(),
                "Extracted text from PDF"
            );
            return Ok(text);
        }

        Err(ExtractError::Unsupported(request.mime_type.to_string()))
    }
}
