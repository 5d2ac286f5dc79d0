use mime_guess::mime::{FromStrError, Mime};

/// Fallback when neither the name nor the bytes identify the type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Leading byte signatures of formats commonly uploaded as knowledge files.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"{\\rtf", "application/rtf"),
];

/// Pick the MIME type an upload is stored under.
///
/// A caller-supplied type wins; otherwise the filename extension, then the
/// content signature, then [`OCTET_STREAM`]. Parameters are dropped and the
/// result is always lowercase. A supplied type that does not parse is an error.
pub fn effective_mime_type(
    supplied: Option<&str>,
    filename: &str,
    bytes: &[u8],
) -> Result<String, FromStrError> {
    let supplied = match supplied.map(str::trim).filter(|m| !m.is_empty()) {
        Some(raw) => Some(raw.parse::<Mime>()?.essence_str().to_string()),
        None => None,
    };

    Ok(supplied
        .or_else(|| guess_from_extension(filename))
        .or_else(|| guess_from_contents(bytes).map(str::to_string))
        .unwrap_or_else(|| OCTET_STREAM.to_string())
        .to_lowercase())
}

pub fn guess_from_extension(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
}

pub fn guess_from_contents(bytes: &[u8]) -> Option<&'static str> {
    if let Some(&(_, mime)) = SIGNATURES.iter().find(|(sig, _)| bytes.starts_with(sig)) {
        return Some(mime);
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if !bytes.is_empty() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
        return Some("text/plain");
    }
    None
}
