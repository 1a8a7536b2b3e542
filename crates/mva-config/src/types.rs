//! Configuration types mapping to the YAML schema.
//!
//! ```yaml
//! directories:
//!   - directory: /srv/mva/gdrive
//!     at: "0 2 * * *"
//!     format: "{humanTime}-{filename}.{ext}"
//!     compress: tar.gz
//!     destination: "gdrive:archive"
//! daemon:
//!   stability:
//!     initial_delay_ms: 1000
//!     resample_delay_ms: 500
//!   upload:
//!     command: rclone
//!   initial_scan: true
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvaConfig {
    /// Watched directories, one archiving session each.
    pub directories: Vec<DirectoryConfig>,

    /// Daemon tunables. Optional in the file.
    #[serde(default)]
    pub daemon: DaemonSettings,
}

impl MvaConfig {
    /// Parse from a YAML string and validate.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: MvaConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The configuration written by `mva init`.
    pub fn sample() -> Self {
        Self {
            directories: vec![
                DirectoryConfig {
                    path: PathBuf::from("/srv/mva/gdrive"),
                    schedule: "0 2 * * *".to_string(),
                    naming_template: DEFAULT_NAMING_TEMPLATE.to_string(),
                    compression: CompressionKind::TarGz.to_string(),
                    destination: "gdrive:archive".to_string(),
                },
                DirectoryConfig {
                    path: PathBuf::from("/srv/mva/azure/archive"),
                    schedule: "0 3 * * *".to_string(),
                    naming_template: DEFAULT_NAMING_TEMPLATE.to_string(),
                    compression: CompressionKind::TarGz.to_string(),
                    destination: "azure:backup".to_string(),
                },
            ],
            daemon: DaemonSettings::default(),
        }
    }

    /// Check every directory entry.
    pub fn validate(&self) -> Result<()> {
        if self.directories.is_empty() {
            return Err(ConfigError::NoDirectories);
        }
        for dir in &self.directories {
            dir.validate()?;
        }
        Ok(())
    }

    /// Find the directory entry that archives to `destination`.
    pub fn find_destination(&self, destination: &str) -> Result<&DirectoryConfig> {
        self.directories
            .iter()
            .find(|d| d.destination == destination)
            .ok_or_else(|| ConfigError::DestinationNotFound(destination.to_string()))
    }
}

/// Template used by the sample config.
pub const DEFAULT_NAMING_TEMPLATE: &str = "{humanTime}-{filename}.{ext}";

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

/// One watched directory and how its files are archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory to watch (direct children only).
    #[serde(rename = "directory", alias = "path")]
    pub path: PathBuf,

    /// 5-field cron expression for the scheduled sweep.
    #[serde(rename = "at", alias = "schedule")]
    pub schedule: String,

    /// Archive name template, e.g. `{humanTime}-{filename}.{ext}`.
    #[serde(rename = "format", alias = "naming_template")]
    pub naming_template: String,

    /// Compression kind as written in the file (`tar.gz` or `none`).
    ///
    /// Kept as a string so that the archive step, not deserialization, is
    /// where an unsupported value is rejected.
    #[serde(rename = "compress", alias = "compression")]
    pub compression: String,

    /// Opaque remote identifier handed to the upload command.
    pub destination: String,
}

impl DirectoryConfig {
    /// Parse the configured compression kind.
    pub fn compression_kind(&self) -> Result<CompressionKind> {
        self.compression.parse()
    }

    /// Parse the configured schedule.
    pub fn parsed_schedule(&self) -> Result<Schedule> {
        Schedule::parse(&self.schedule)
    }

    fn validate(&self) -> Result<()> {
        let context = format!("directory entry '{}'", self.path.display());
        let missing = |field: &str| ConfigError::MissingField {
            field: field.to_string(),
            context: context.clone(),
        };

        if self.path.as_os_str().is_empty() {
            return Err(missing("directory"));
        }
        if self.schedule.trim().is_empty() {
            return Err(missing("at"));
        }
        if self.naming_template.trim().is_empty() {
            return Err(missing("format"));
        }
        if self.compression.trim().is_empty() {
            return Err(missing("compress"));
        }
        if self.destination.trim().is_empty() {
            return Err(missing("destination"));
        }

        self.parsed_schedule()?;
        self.compression_kind()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compression
// ─────────────────────────────────────────────────────────────────────────────

/// Supported artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// Single-entry gzip tarball.
    TarGz,
    /// The renamed file, uncompressed.
    None,
}

impl CompressionKind {
    /// Extension appended to the rendered name, if any.
    pub fn artifact_suffix(&self) -> Option<&'static str> {
        match self {
            CompressionKind::TarGz => Some(".tar.gz"),
            CompressionKind::None => None,
        }
    }
}

impl FromStr for CompressionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "tar.gz" => Ok(CompressionKind::TarGz),
            "none" => Ok(CompressionKind::None),
            other => Err(ConfigError::UnsupportedCompression(other.to_string())),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::TarGz => write!(f, "tar.gz"),
            CompressionKind::None => write!(f, "none"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Daemon tunables
// ─────────────────────────────────────────────────────────────────────────────

/// Process-wide daemon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Write-settle detection timings.
    pub stability: StabilitySettings,

    /// Upload command settings.
    pub upload: UploadSettings,

    /// Parent directory for per-task temp directories.
    /// Default: `<system temp>/mva`
    pub temp_dir: Option<PathBuf>,

    /// Queue files already present when a session starts.
    /// Default: true
    pub initial_scan: bool,

    /// Watcher event channel capacity.
    /// Default: 256
    pub event_buffer: usize,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            stability: StabilitySettings::default(),
            upload: UploadSettings::default(),
            temp_dir: None,
            initial_scan: true,
            event_buffer: 256,
        }
    }
}

impl DaemonSettings {
    /// Effective temp root, falling back to `<system temp>/mva`.
    pub fn effective_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mva"))
    }
}

/// Timings for the write-settle heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    /// Wait after the triggering event before the first size sample.
    /// Default: 1000ms
    pub initial_delay_ms: u64,

    /// Wait between the first and second size sample.
    /// Default: 500ms
    pub resample_delay_ms: u64,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            resample_delay_ms: 500,
        }
    }
}

impl StabilitySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn resample_delay(&self) -> Duration {
        Duration::from_millis(self.resample_delay_ms)
    }
}

/// External upload command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Executable invoked as `<command> copy <file> <destination>`.
    /// Default: `rclone`
    pub command: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            command: "rclone".to_string(),
        }
    }
}
