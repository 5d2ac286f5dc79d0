/// Longest filename accepted on upload, in characters.
pub const MAX_FILENAME_LEN: usize = 255;

/// Result of validating an upload filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains null bytes.
    NullByte,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Filename is longer than [`MAX_FILENAME_LEN`].
    TooLong,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::TooLong => "Invalid filename: longer than 255 characters",
        }
    }
}

/// Validates the filename of an uploaded knowledge file.
pub fn validate_upload_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // The name is echoed back as the listing's `name` and the entry key;
    // keep it printable.
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.chars().count() > MAX_FILENAME_LEN {
        return Err(FilenameError::TooLong);
    }

    Ok(trimmed)
}

/// Lowercase extension of a filename, if it has a non-empty one.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
