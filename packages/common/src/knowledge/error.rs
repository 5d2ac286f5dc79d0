use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    #[error("Page size must be between 1 and {max}, got {requested}")]
    InvalidPageSize { requested: u64, max: u64 },

    #[error("Entry metadata does not match the expected schema: {0}")]
    InvalidMetadata(String),

    #[error("Stored content hash is corrupt: {0}")]
    CorruptHash(String),

    #[cfg(feature = "sea-orm")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}
