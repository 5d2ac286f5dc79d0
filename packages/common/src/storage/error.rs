use std::fmt;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The provided storage id is not a valid identifier.
    InvalidId(String),
    /// The stored content hash could not be parsed.
    InvalidHash(String),
    /// The blob metadata sidecar could not be read or written.
    Metadata(serde_json::Error),
    /// The blob exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "blob not found: {id}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidId(msg) => write!(f, "invalid storage id: {msg}"),
            Self::InvalidHash(msg) => write!(f, "invalid content hash: {msg}"),
            Self::Metadata(err) => write!(f, "blob metadata error: {err}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "blob exceeds size limit ({actual} > {limit} bytes)")
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Metadata(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Metadata(err)
    }
}
