//! Archive name rendering.
//!
//! Recognized placeholders:
//!
//! | Placeholder   | Example                 |
//! |---------------|-------------------------|
//! | `{humanTime}` | `2024-03-05_14-07-09`   |
//! | `{filename}`  | `report` (stem)         |
//! | `{ext}`       | `pdf` (no leading dot)  |
//! | `{timestamp}` | `1709647629000` (ms)    |
//! | `{date}`      | `2024-03-05`            |
//! | `{time}`      | `14-07-09`              |
//! | `{size}`      | `10` (bytes)            |
//!
//! All times are UTC, including `{time}`. Earlier mva releases rendered
//! `{time}` in local wall-clock time; on a host outside UTC the hour in new
//! names differs from names produced before upgrading.
//!
//! Anything else in braces is left as written.

use std::path::Path;

use chrono::{DateTime, Utc};

/// Facts about a source file captured when its pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// File stem (name without the final extension).
    pub filename: String,
    /// Final extension without the leading dot; empty if none.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// When the file was picked up.
    pub detected_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Build metadata from a path and size.
    pub fn from_path(path: &Path, size: u64, detected_at: DateTime<Utc>) -> Self {
        let filename = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            filename,
            extension,
            size,
            detected_at,
        }
    }
}

/// Render `template` for the given file.
pub fn render_archive_name(metadata: &FileMetadata, template: &str) -> String {
    let at = metadata.detected_at;

    template
        .replace("{humanTime}", &at.format("%Y-%m-%d_%H-%M-%S").to_string())
        .replace("{filename}", &metadata.filename)
        .replace("{ext}", &metadata.extension)
        .replace("{timestamp}", &at.timestamp_millis().to_string())
        .replace("{date}", &at.format("%Y-%m-%d").to_string())
        .replace("{time}", &at.format("%H-%M-%S").to_string())
        .replace("{size}", &metadata.size.to_string())
}

/// Whether `name` can be used as a single path component.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
