//! The per-file archive pipeline.
//!
//! Steps, each failure aborting the rest:
//!
//! 1. capture metadata
//! 2. render the archive name
//! 3. create a scoped temp directory
//! 4. copy the source into it under the rendered name
//! 5. compress (or not)
//! 6. upload
//! 7. remove the source, only after step 6 succeeded
//! 8. remove the temp directory, always

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mva_config::{CompressionKind, DirectoryConfig};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::compression::build_artifact;
use crate::error::{ArchiveError, Result};
use crate::naming::{FileMetadata, is_valid_file_name, render_archive_name};
use crate::upload::SharedUploader;

/// Prefix of per-task temp directories.
pub const TEMP_DIR_PREFIX: &str = "mva-";

/// What produced a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Filesystem create event.
    Event,
    /// Scheduled sweep.
    Schedule,
    /// File already present when the session started.
    StartupScan,
    /// Explicit request from the command line.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Event => write!(f, "event"),
            Trigger::Schedule => write!(f, "schedule"),
            Trigger::StartupScan => write!(f, "startup-scan"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// One candidate file on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct ArchiveTask {
    /// Correlation id for logs.
    pub id: Uuid,
    /// File to archive.
    pub source_path: PathBuf,
    /// Settings of the directory the file belongs to.
    pub directory: Arc<DirectoryConfig>,
    /// When the trigger saw the file.
    pub detected_at: DateTime<Utc>,
    /// Which trigger saw it.
    pub trigger: Trigger,
}

impl ArchiveTask {
    /// Create a task detected now.
    pub fn new(
        source_path: impl Into<PathBuf>,
        directory: Arc<DirectoryConfig>,
        trigger: Trigger,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            directory,
            detected_at: Utc::now(),
            trigger,
        }
    }
}

/// Proof of a completed archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    /// Original file, now removed.
    pub source: PathBuf,
    /// Name of the uploaded artifact.
    pub artifact_name: String,
    /// Where it went.
    pub destination: String,
    /// Size of the original in bytes.
    pub original_size: u64,
    /// Size of the uploaded artifact in bytes.
    pub artifact_size: u64,
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of the per-task temp directories. Created on demand.
    pub temp_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("mva"),
        }
    }
}

/// Stages, compresses, uploads and cleans up single files.
///
/// Stateless apart from its configuration, so one instance is shared by
/// every directory session.
#[derive(Clone)]
pub struct ArchivePipeline {
    config: PipelineConfig,
    uploader: SharedUploader,
}

impl ArchivePipeline {
    /// Create a pipeline.
    pub fn new(config: PipelineConfig, uploader: SharedUploader) -> Self {
        Self { config, uploader }
    }

    /// The upload collaborator.
    pub fn uploader(&self) -> &SharedUploader {
        &self.uploader
    }

    /// Run the pipeline for one task.
    ///
    /// On `Ok` the artifact is uploaded and the source is gone. On `Err` the
    /// source is exactly as it was, unless the failure was removing it. The
    /// temp directory never outlives this call.
    pub async fn archive(&self, task: &ArchiveTask) -> Result<ArchiveReceipt> {
        let result = self.run(task).await;

        match &result {
            Ok(receipt) => info!(
                task = %task.id,
                trigger = %task.trigger,
                source = %task.source_path.display(),
                destination = %receipt.destination,
                artifact = %receipt.artifact_name,
                bytes = receipt.artifact_size,
                "archived"
            ),
            Err(e) => error!(
                task = %task.id,
                trigger = %task.trigger,
                source = %task.source_path.display(),
                destination = %task.directory.destination,
                class = %e.class(),
                retryable = e.is_retryable(),
                error = %e,
                "archive failed"
            ),
        }

        result
    }

    async fn run(&self, task: &ArchiveTask) -> Result<ArchiveReceipt> {
        let directory = &task.directory;
        let source = &task.source_path;

        // Reject bad config before anything touches the filesystem
        let kind: CompressionKind = directory
            .compression_kind()
            .map_err(|_| ArchiveError::UnsupportedCompression(directory.compression.clone()))?;

        // 1. Metadata
        let meta = tokio::fs::metadata(source)
            .await
            .map_err(|e| ArchiveError::SourceUnavailable {
                path: source.clone(),
                source: e,
            })?;
        if !meta.is_file() {
            return Err(ArchiveError::SourceUnavailable {
                path: source.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a regular file",
                ),
            });
        }
        let metadata = FileMetadata::from_path(source, meta.len(), task.detected_at);

        // 2. Name
        let name = render_archive_name(&metadata, &directory.naming_template);
        if !is_valid_file_name(&name) {
            return Err(ArchiveError::InvalidArchiveName {
                name,
                template: directory.naming_template.clone(),
            });
        }

        // 3. Scoped temp dir, removed on drop from here on
        let workdir = self.create_workdir().await?;
        debug!(task = %task.id, workdir = %workdir.path().display(), "staging");

        let outcome = self
            .stage_and_upload(task, kind, &name, workdir.path())
            .await;

        // 8. Always clean up
        let workdir_path = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            warn!(
                task = %task.id,
                workdir = %workdir_path.display(),
                error = %e,
                "failed to remove temp directory"
            );
        }

        let (artifact_name, artifact_size) = outcome?;

        Ok(ArchiveReceipt {
            source: source.clone(),
            artifact_name,
            destination: directory.destination.clone(),
            original_size: metadata.size,
            artifact_size,
        })
    }

    /// Steps 4–7. Returns the artifact's name and size.
    async fn stage_and_upload(
        &self,
        task: &ArchiveTask,
        kind: CompressionKind,
        name: &str,
        workdir: &Path,
    ) -> Result<(String, u64)> {
        let source = &task.source_path;
        let destination = &task.directory.destination;

        // 4. Copy, never move
        let staged = workdir.join(name);
        tokio::fs::copy(source, &staged)
            .await
            .map_err(|e| ArchiveError::io("copy", source, e))?;

        // 5. Compress
        let artifact = tokio::task::spawn_blocking({
            let staged = staged.clone();
            move || build_artifact(kind, &staged)
        })
        .await
        .map_err(|e| ArchiveError::Compression {
            path: staged.clone(),
            message: e.to_string(),
        })??;

        let artifact_size = tokio::fs::metadata(&artifact)
            .await
            .map_err(|e| ArchiveError::io("stat", &artifact, e))?
            .len();
        let artifact_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // 6. Upload
        debug!(task = %task.id, artifact = %artifact.display(), %destination, "uploading");
        self.uploader
            .upload(&artifact, destination)
            .await
            .map_err(|e| ArchiveError::Upload {
                destination: destination.clone(),
                source: e,
            })?;

        // 7. Upload confirmed; the original can go
        tokio::fs::remove_file(source)
            .await
            .map_err(|e| ArchiveError::io("remove original", source, e))?;

        Ok((artifact_name, artifact_size))
    }

    async fn create_workdir(&self) -> Result<TempDir> {
        let root = &self.config.temp_root;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| ArchiveError::io("create temp root", root, e))?;

        tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir_in(root)
            .map_err(|e| ArchiveError::io("create temp directory in", root, e))
    }
}

impl fmt::Debug for ArchivePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivePipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
