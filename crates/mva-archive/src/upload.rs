//! Upload collaborators.
//!
//! The pipeline only knows the [`Uploader`] trait. [`RcloneUploader`] shells
//! out to an rclone-compatible executable; [`MockUploader`] records calls for
//! tests.
//!
//! There is no timeout on the subprocess. A hung upload command holds its
//! file's task until the command exits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tracing::debug;

use crate::error::UploadError;

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Pushes a local artifact to an opaque destination.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Copy `local` to `destination`. `Ok` means the remote copy is confirmed.
    async fn upload(&self, local: &Path, destination: &str) -> UploadResult<()>;

    /// Check that `destination` is reachable.
    async fn probe(&self, destination: &str) -> UploadResult<()>;
}

/// Shared uploader handle.
pub type SharedUploader = Arc<dyn Uploader>;

// ─────────────────────────────────────────────────────────────────────────────
// rclone
// ─────────────────────────────────────────────────────────────────────────────

/// Uploads with `<command> copy <file> <destination>`.
#[derive(Debug, Clone)]
pub struct RcloneUploader {
    command: String,
}

impl RcloneUploader {
    /// Create an uploader that runs `command` (e.g. `rclone`).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The executable being invoked.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn copy_args(local: &Path, destination: &str) -> Vec<String> {
        vec![
            "copy".to_string(),
            local.to_string_lossy().into_owned(),
            destination.to_string(),
        ]
    }

    fn probe_args(destination: &str) -> Vec<String> {
        vec!["lsd".to_string(), destination.to_string()]
    }

    async fn run(&self, args: &[String]) -> UploadResult<()> {
        debug!(command = %self.command, ?args, "running upload command");

        let output = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| UploadError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(command = %self.command, stdout = %stdout.trim(), "upload command stdout");
        }

        if output.status.success() {
            return Ok(());
        }

        Err(UploadError::Failed {
            command: self.command.clone(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Default for RcloneUploader {
    fn default() -> Self {
        Self::new("rclone")
    }
}

#[async_trait]
impl Uploader for RcloneUploader {
    async fn upload(&self, local: &Path, destination: &str) -> UploadResult<()> {
        self.run(&Self::copy_args(local, destination)).await
    }

    async fn probe(&self, destination: &str) -> UploadResult<()> {
        self.run(&Self::probe_args(destination)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock
// ─────────────────────────────────────────────────────────────────────────────

/// One call recorded by [`MockUploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Path handed to `upload`.
    pub local: PathBuf,
    /// File name of the artifact.
    pub file_name: String,
    /// Artifact bytes at upload time.
    pub contents: Vec<u8>,
    /// Destination handed to `upload`.
    pub destination: String,
}

#[derive(Debug, Default)]
struct MockState {
    uploads: Vec<RecordedUpload>,
    probes: Vec<String>,
    fail_uploads: Option<String>,
    fail_probes: Option<String>,
}

/// A mock uploader for testing purposes.
///
/// Reads the artifact when `upload` is called (the temp directory is gone
/// once the pipeline returns) and keeps every call for inspection.
#[derive(Debug, Clone, Default)]
pub struct MockUploader {
    state: Arc<Mutex<MockState>>,
}

impl MockUploader {
    /// A mock that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose uploads fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.state.lock().fail_uploads = Some(message.into());
        mock
    }

    /// Make probes fail with `message`.
    pub fn with_failing_probe(self, message: impl Into<String>) -> Self {
        self.state.lock().fail_probes = Some(message.into());
        self
    }

    /// Uploads seen so far, including failed ones.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().uploads.clone()
    }

    /// Number of upload calls.
    pub fn upload_count(&self) -> usize {
        self.state.lock().uploads.len()
    }

    /// Destinations probed so far.
    pub fn probes(&self) -> Vec<String> {
        self.state.lock().probes.clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, local: &Path, destination: &str) -> UploadResult<()> {
        let contents = tokio::fs::read(local).await.unwrap_or_default();
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state = self.state.lock();
        state.uploads.push(RecordedUpload {
            local: local.to_path_buf(),
            file_name,
            contents,
            destination: destination.to_string(),
        });

        match &state.fail_uploads {
            Some(message) => Err(UploadError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    async fn probe(&self, destination: &str) -> UploadResult<()> {
        let mut state = self.state.lock();
        state.probes.push(destination.to_string());

        match &state.fail_probes {
            Some(message) => Err(UploadError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}
