use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::StorageId;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{storage_id}",
    tag = "Storage",
    operation_id = "downloadBlob",
    summary = "Download a stored file",
    description = "Streams a stored upload. Supports ETag-based caching via If-None-Match. \
        Storage IDs are unguessable and handed out only through file listings.",
    params(("storage_id" = String, Path, description = "Storage ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Malformed storage ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_blob(
    State(state): State<AppState>,
    Path(storage_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let storage_id: StorageId = storage_id.parse()?;

    let metadata = state
        .blob_store
        .metadata(&storage_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let etag_value = format!("\"{}\"", metadata.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.blob_store.get_stream(&storage_id).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, metadata.content_type)
        .header(header::CONTENT_LENGTH, metadata.size.to_string())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
