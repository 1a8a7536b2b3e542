//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file at the expected location.
    #[error("configuration file not found at '{path}'. Run \"mva init\" to create it")]
    NotFound { path: String },

    /// `init` was asked to overwrite an existing file.
    #[error("configuration file already exists at '{path}'")]
    AlreadyExists { path: String },

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    /// The `directories` list is empty.
    #[error("invalid configuration: no directories configured")]
    NoDirectories,

    /// Missing required field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Schedule is not a valid 5-field cron expression.
    #[error("invalid cron format '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },

    /// Compression kind is not one of the supported values.
    #[error("unsupported compression format '{0}' (expected \"tar.gz\" or \"none\")")]
    UnsupportedCompression(String),

    /// No directory entry uses the requested destination.
    #[error("destination '{0}' not found in config")]
    DestinationNotFound(String),
}
