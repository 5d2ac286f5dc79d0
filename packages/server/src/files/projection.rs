use common::knowledge::EntryStatus;

use crate::models::file::FileStatus;
use crate::utils::filename;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with 1024-based units.
///
/// Whole bytes below 1 KB, one decimal place above; stops at GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// File type shown for an entry key: its lowercase extension, `txt` if none.
pub fn file_type(key: &str) -> String {
    filename::extension(key).unwrap_or_else(|| "txt".to_string())
}

pub fn file_status(status: EntryStatus) -> FileStatus {
    match status {
        EntryStatus::Ready => FileStatus::Ready,
        EntryStatus::Pending => FileStatus::Processing,
        EntryStatus::Failed => FileStatus::Error,
    }
}
