//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use mva_archive::{RcloneUploader, SharedUploader};
use mva_config::MvaConfig;

pub mod archive;
pub mod init;
pub mod setup;
pub mod start;
pub mod status;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config file in use.
    pub config_path: PathBuf,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load and validate the config file.
    pub fn load_config(&self) -> Result<MvaConfig> {
        Ok(mva_config::load_config(&self.config_path)?)
    }
}

/// The uploader configured under `daemon.upload`.
pub fn uploader(config: &MvaConfig) -> SharedUploader {
    Arc::new(RcloneUploader::new(config.daemon.upload.command.clone()))
}
