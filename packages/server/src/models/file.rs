use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Display status of a knowledge file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ready,
    Processing,
    Error,
}

/// A knowledge file as shown on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicFile {
    /// Entry ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Original filename.
    #[schema(example = "refund-policy.pdf")]
    pub name: String,
    /// Lowercase file extension.
    #[serde(rename = "type")]
    #[schema(example = "pdf")]
    pub file_type: String,
    /// Human-readable size, or `unknown`.
    #[schema(example = "1.5 KB")]
    pub size: String,
    pub status: FileStatus,
    /// Download URL of the original upload.
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "policy")]
    pub category: Option<String>,
}

/// Response to a successful upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddFileResponse {
    /// Download URL of the stored file. For a duplicate upload this is the
    /// URL of the file that was already registered.
    pub url: Option<String>,
    pub entry_id: String,
    /// `false` when identical content was already registered for the organization.
    pub created: bool,
}

/// Query parameters for listing knowledge files.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FileListQuery {
    /// Only return files in this category. Applied after pagination.
    pub category: Option<String>,
    /// Page size (1-100, default 20).
    pub num_items: Option<u64>,
    /// Continuation cursor from a previous page.
    pub cursor: Option<String>,
}

/// One page of knowledge files.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub page: Vec<PublicFile>,
    pub is_done: bool,
    pub continue_cursor: String,
}
