use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::knowledge::{DEFAULT_PAGE_SIZE, EntryId, PaginationOpts};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::RequestContext;
use crate::files::mime::OCTET_STREAM;
use crate::files::{FileUpload, ListFiles};
use crate::models::file::{AddFileResponse, FileListQuery, FileListResponse};
use crate::state::AppState;

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Knowledge Files",
    operation_id = "uploadFile",
    summary = "Upload a knowledge file",
    description = "Stores the file, extracts its text and registers it with the organization's \
        knowledge namespace. The `file` multipart field is required. Optional text fields: \
        `filename` (overrides the part's filename), `mime_type`, `category`. \
        Uploading content that is already registered returns the existing entry with \
        `created: false` and does not keep a second copy.",
    request_body(content_type = "multipart/form-data", description = "File upload with optional metadata"),
    responses(
        (status = 201, description = "File registered (or matched an existing entry)", body = AddFileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
        (status = 415, description = "No text can be extracted (UNSUPPORTED_MEDIA_TYPE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, ctx, multipart))]
pub async fn upload_file(
    ctx: RequestContext,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.storage.max_blob_size;

    let mut bytes: Option<Vec<u8>> = None;
    let mut part_filename: Option<String> = None;
    let mut part_content_type: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut category: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                part_filename = field.file_name().map(str::to_string);
                part_content_type = field
                    .content_type()
                    .filter(|ct| !ct.eq_ignore_ascii_case(OCTET_STREAM))
                    .map(str::to_string);
                bytes = Some(read_file_field(field, max_size).await?);
            }
            Some("filename") => filename = Some(read_text_field(field, "filename").await?),
            Some("mime_type") => mime_type = Some(read_text_field(field, "mime_type").await?),
            Some("category") => category = Some(read_text_field(field, "category").await?),
            _ => {} // Ignore unknown fields.
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let filename = filename
        .filter(|f| !f.trim().is_empty())
        .or(part_filename)
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;

    let added = state
        .files
        .add_file(
            &ctx,
            FileUpload {
                filename,
                bytes,
                mime_type: mime_type
                    .filter(|m| !m.trim().is_empty())
                    .or(part_content_type),
                category,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddFileResponse {
            url: added.url,
            entry_id: added.entry_id.to_string(),
            created: added.created,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Knowledge Files",
    operation_id = "listFiles",
    summary = "List knowledge files",
    description = "Returns one page of the organization's knowledge files, oldest first. \
        The `category` filter is applied to the fetched page, so a filtered page may hold \
        fewer than `num_items` files while `is_done` is still false. An organization that \
        never uploaded anything gets an empty, finished page.",
    params(FileListQuery),
    responses(
        (status = 200, description = "Page of files", body = FileListResponse),
        (status = 400, description = "Invalid cursor or page size (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, ctx))]
pub async fn list_files(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>, AppError> {
    let result = state
        .files
        .list(
            &ctx,
            ListFiles {
                category: query.category.filter(|c| !c.is_empty()),
                pagination: PaginationOpts {
                    num_items: query.num_items.unwrap_or(DEFAULT_PAGE_SIZE),
                    cursor: query.cursor,
                },
            },
        )
        .await?;

    Ok(Json(FileListResponse {
        page: result.page,
        is_done: result.is_done,
        continue_cursor: result.continue_cursor,
    }))
}

#[utoipa::path(
    delete,
    path = "/{entry_id}",
    tag = "Knowledge Files",
    operation_id = "deleteFile",
    summary = "Delete a knowledge file",
    description = "Removes the entry from the organization's namespace and deletes the stored \
        file. Only the organization that uploaded the file may delete it.",
    params(("entry_id" = String, Path, description = "Entry ID (UUID)")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 400, description = "Malformed entry ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_INVALID, UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, ctx))]
pub async fn delete_file(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry_id: EntryId = entry_id.parse()?;
    state.files.delete_file(&ctx, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Buffer the file part, rejecting it as soon as it exceeds `max_size`.
async fn read_file_field(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn read_text_field(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}
