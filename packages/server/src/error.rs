use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::knowledge::IndexError;
use common::storage::StorageError;
use serde::Serialize;

use crate::extract::ExtractError;
use crate::files::FileError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_INVALID`,
    /// `UNAUTHORIZED`, `NOT_FOUND`, `UNSUPPORTED_MEDIA_TYPE`, `INTERNAL_ERROR`.
    #[schema(example = "UNAUTHORIZED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Organization not found")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenInvalid,
    Unauthorized(String),
    NotFound(String),
    UnsupportedMediaType(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "UNAUTHORIZED",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorBody {
                    code: "UNSUPPORTED_MEDIA_TYPE",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".into()),
            StorageError::InvalidId(_) => AppError::Validation("Invalid storage ID".into()),
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::Validation(format!("File exceeds maximum size of {limit} bytes"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidId(_) => AppError::Validation("Invalid entry ID".into()),
            IndexError::InvalidCursor(_) | IndexError::InvalidPageSize { .. } => {
                AppError::Validation(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Unsupported(_) => AppError::UnsupportedMediaType(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Unauthorized(msg) => AppError::Unauthorized(msg.into()),
            FileError::NotFound(msg) => AppError::NotFound(msg.into()),
            FileError::Validation(msg) => AppError::Validation(msg),
            FileError::Storage(e) => e.into(),
            FileError::Index(e) => e.into(),
            FileError::Extraction(e) => e.into(),
        }
    }
}
