//! Error types for archiving.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors from the upload command.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload command could not be started at all.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The upload command ran and reported failure.
    #[error("'{command}' failed with code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Failure injected by a mock uploader.
    #[error("{0}")]
    Rejected(String),
}

/// Broad category of an archive failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad directory config; retrying will not help.
    Configuration,
    /// Filesystem trouble on this file only.
    Io,
    /// Building the artifact failed.
    Compression,
    /// The remote copy did not succeed; the original is still in place.
    Upload,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Configuration => write!(f, "configuration"),
            ErrorClass::Io => write!(f, "io"),
            ErrorClass::Compression => write!(f, "compression"),
            ErrorClass::Upload => write!(f, "upload"),
        }
    }
}

/// Errors that abort a single file's pipeline.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Compression kind is not supported.
    #[error("unsupported compression format: {0}")]
    UnsupportedCompression(String),

    /// The template rendered to something that is not a plain file name.
    #[error("archive name '{name}' rendered from template '{template}' is not a valid file name")]
    InvalidArchiveName { name: String, template: String },

    /// The source file is missing or unreadable.
    #[error("source file {path} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A filesystem step failed.
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Building the tarball failed.
    #[error("failed to compress {path}: {message}")]
    Compression { path: PathBuf, message: String },

    /// The upload did not succeed.
    #[error("upload to {destination} failed: {source}")]
    Upload {
        destination: String,
        source: UploadError,
    },
}

impl ArchiveError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ArchiveError::UnsupportedCompression(_) | ArchiveError::InvalidArchiveName { .. } => {
                ErrorClass::Configuration
            }
            ArchiveError::SourceUnavailable { .. } | ArchiveError::Io { .. } => ErrorClass::Io,
            ArchiveError::Compression { .. } => ErrorClass::Compression,
            ArchiveError::Upload { .. } => ErrorClass::Upload,
        }
    }

    /// Whether a later trigger could succeed on the same file.
    pub fn is_retryable(&self) -> bool {
        self.class() != ErrorClass::Configuration
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
