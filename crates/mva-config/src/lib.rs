//! Configuration system for the mva archiving daemon.
//!
//! Provides the YAML configuration model with:
//! - One entry per watched directory (`directories:`)
//! - Optional daemon tunables (`daemon:`) for settle timings, the upload
//!   command and temp storage
//! - Config discovery (`MVA_CONFIG_DIR` → `~/.mva/config.yml`)
//! - 5-field cron schedule parsing

pub mod discovery;
pub mod error;
pub mod schedule;
pub mod types;

pub use discovery::{config_dir, config_path, init_config, load_config, save_config};
pub use error::{ConfigError, Result};
pub use schedule::Schedule;
pub use types::*;
