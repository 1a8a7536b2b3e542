//! Config file location, loading and initialization.
//!
//! Resolution order for the config directory:
//! 1. `MVA_CONFIG_DIR` environment variable (if non-empty)
//! 2. `~/.mva`
//!
//! The config file inside it is always `config.yml`.

use std::path::{Path, PathBuf};

use crate::{ConfigError, MvaConfig, Result};

/// Config filename within the config directory.
const CONFIG_FILE: &str = "config.yml";

/// Directory name under the home directory.
const APP_DIR: &str = ".mva";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "MVA_CONFIG_DIR";

/// Get the config directory for mva.
///
/// Checks `MVA_CONFIG_DIR` first, then falls back to `~/.mva`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|d| d.join(APP_DIR))
}

/// Get the default config file path.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Load and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<MvaConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    MvaConfig::from_yaml(&contents)
}

/// Validate and save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &MvaConfig, path: &Path) -> Result<()> {
    config.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_yaml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Write the sample config to `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<MvaConfig> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.display().to_string(),
        });
    }

    let config = MvaConfig::sample();
    save_config(&config, path)?;
    Ok(config)
}
