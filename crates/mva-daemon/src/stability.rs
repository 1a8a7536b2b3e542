//! Write-stability heuristic.
//!
//! A file is considered finished when it is still a regular file of the same
//! size after a settle period. Slow writers that pause longer than the
//! resample delay can still be caught mid-write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mva_config::StabilitySettings;
use tracing::trace;

/// One size sample of a candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Path that was sampled.
    pub path: PathBuf,
    /// Size in bytes at sampling time.
    pub size: u64,
}

impl FileFingerprint {
    /// Sample `path`. `Err` carries the verdict explaining why there is no
    /// fingerprint.
    pub async fn sample(path: &Path) -> Result<Self, StabilityVerdict> {
        // symlink_metadata: a link is not a regular file
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(_) => return Err(StabilityVerdict::Missing),
        };
        if !meta.file_type().is_file() {
            return Err(StabilityVerdict::NotRegularFile);
        }
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
        })
    }
}

/// Outcome of a stability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityVerdict {
    /// Same size across both samples.
    Stable { size: u64 },
    /// Path is gone.
    Missing,
    /// Directory, symlink or other non-regular entry.
    NotRegularFile,
    /// Size moved between samples.
    Changed { before: u64, after: u64 },
}

impl StabilityVerdict {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityVerdict::Stable { .. })
    }

    /// Short reason used in logs and skip outcomes.
    pub fn reason(&self) -> String {
        match self {
            StabilityVerdict::Stable { size } => format!("stable at {size} bytes"),
            StabilityVerdict::Missing => "file disappeared".to_string(),
            StabilityVerdict::NotRegularFile => "not a regular file".to_string(),
            StabilityVerdict::Changed { before, after } => {
                format!("still being written ({before} -> {after} bytes)")
            }
        }
    }
}

/// Decides whether a newly observed file has finished being written.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    initial_delay: Duration,
    resample_delay: Duration,
}

impl StabilityDetector {
    pub fn new(initial_delay: Duration, resample_delay: Duration) -> Self {
        Self {
            initial_delay,
            resample_delay,
        }
    }

    pub fn from_settings(settings: &StabilitySettings) -> Self {
        Self::new(settings.initial_delay(), settings.resample_delay())
    }

    /// Wait, sample, wait again, resample, compare.
    pub async fn check(&self, path: &Path) -> StabilityVerdict {
        tokio::time::sleep(self.initial_delay).await;
        let first = match FileFingerprint::sample(path).await {
            Ok(fp) => fp,
            Err(verdict) => return verdict,
        };

        tokio::time::sleep(self.resample_delay).await;
        let second = match FileFingerprint::sample(path).await {
            Ok(fp) => fp,
            Err(verdict) => return verdict,
        };

        trace!(
            path = %path.display(),
            before = first.size,
            after = second.size,
            "stability samples"
        );

        if first == second {
            StabilityVerdict::Stable { size: second.size }
        } else {
            StabilityVerdict::Changed {
                before: first.size,
                after: second.size,
            }
        }
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self::from_settings(&StabilitySettings::default())
    }
}
