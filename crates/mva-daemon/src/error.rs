//! Error types for the daemon.

use std::path::PathBuf;

use mva_config::ConfigError;
use thiserror::Error;

use crate::supervisor::DaemonState;

/// Errors that can occur while setting up filesystem watching.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Failed to create the file watcher.
    #[error("Failed to create file watcher: {0}")]
    InitFailed(String),

    /// Failed to watch a path.
    #[error("Failed to watch path {path}: {error}")]
    WatchFailed { path: PathBuf, error: String },
}

/// Result type for watcher operations.
pub type WatcherResult<T> = std::result::Result<T, WatcherError>;

/// Errors surfaced by sessions and the supervisor.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// `start()` called while not stopped.
    #[error("Daemon is already running")]
    AlreadyRunning,

    /// Operation not allowed in the current state.
    #[error("Cannot {action} while daemon is {state}")]
    InvalidTransition {
        action: &'static str,
        state: DaemonState,
    },

    /// A watched directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory entry failed validation at session start.
    #[error("Invalid configuration for {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// The watcher could not be armed.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DaemonError::AlreadyRunning.to_string(),
            "Daemon is already running"
        );

        let err = DaemonError::InvalidTransition {
            action: "stop",
            state: DaemonState::Starting,
        };
        assert_eq!(err.to_string(), "Cannot stop while daemon is starting");

        let err = DaemonError::from(WatcherError::WatchFailed {
            path: PathBuf::from("/srv/in"),
            error: "permission denied".to_string(),
        });
        assert!(err.to_string().contains("/srv/in"));
        assert!(err.to_string().contains("permission denied"));
    }
}
