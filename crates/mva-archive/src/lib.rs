//! Single-file archiving for mva.
//!
//! An [`ArchivePipeline`] takes one file from a watched directory, copies it
//! into a scoped temp directory under its rendered archive name, optionally
//! wraps it in a gzip tarball, hands the artifact to an [`Uploader`], and
//! removes the original only once the upload is confirmed.
//!
//! ```text
//! source ──copy──▶ temp/<name> ──compress──▶ temp/<name>.tar.gz ──upload──▶ destination
//!    │                                                                  │
//!    └────────────────────────── removed only on success ◀──────────────┘
//! ```

pub mod compression;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod upload;

pub use error::{ArchiveError, ErrorClass, Result, UploadError};
pub use naming::{FileMetadata, render_archive_name};
pub use pipeline::{
    ArchivePipeline, ArchiveReceipt, ArchiveTask, PipelineConfig, TEMP_DIR_PREFIX, Trigger,
};
pub use upload::{
    MockUploader, RcloneUploader, RecordedUpload, SharedUploader, UploadResult, Uploader,
};
