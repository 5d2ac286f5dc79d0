use common::knowledge::IndexError;
use common::storage::StorageError;
use thiserror::Error;

use crate::extract::ExtractError;

/// Failure of a file workflow.
///
/// Authorization and existence failures are classified; collaborator
/// failures pass through untouched.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}
