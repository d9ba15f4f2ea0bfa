//! Error types for config discovery and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unsupported configuration format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// The file parsed, but does not hold an object or an array of objects.
    #[error("{} must export an object or an array of objects, found {found}", .path.display())]
    InvalidShape { path: PathBuf, found: String },

    #[error("invalid config in {}: {reason}", .path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Path of the config file the error is about, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ConfigError::NotFound(path) | ConfigError::UnsupportedFormat(path) => Some(path),
            ConfigError::Parse { path, .. }
            | ConfigError::InvalidShape { path, .. }
            | ConfigError::Schema { path, .. }
            | ConfigError::Io { path, .. } => Some(path),
            ConfigError::InvalidPattern { .. } => None,
        }
    }
}
