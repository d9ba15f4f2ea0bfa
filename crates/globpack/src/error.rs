//! Error types for globpack orchestration.

use std::path::PathBuf;

use globpack_config::ConfigError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A matched file is not a loadable or valid config.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bundler reported compile errors, or the compiler faulted.
    #[error("Compilation of {} failed: {reason}", .config.display())]
    Compile { config: PathBuf, reason: String },

    /// The bundler reported warnings while warnings are escalated.
    #[error("Compilation of {} produced {count} warning(s) and warnings are fatal", .config.display())]
    CompileWarning { config: PathBuf, count: usize },

    #[error("Failed to watch {}: {reason}", .root.display())]
    WatchSetup { root: PathBuf, reason: String },

    #[error("Failed to close watcher for {}: {reason}", .config.display())]
    Teardown { config: PathBuf, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Config file the error is about, when there is one.
    pub fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Error::Config(err) => err.path(),
            Error::Compile { config, .. }
            | Error::CompileWarning { config, .. }
            | Error::Teardown { config, .. } => Some(config),
            Error::WatchSetup { root, .. } => Some(root),
            Error::InvalidArgument(_) | Error::Io(_) | Error::Json(_) => None,
        }
    }
}

/// A fatal fault raised by a compiler itself, as opposed to errors reported
/// inside successful stats.
#[derive(Debug, Error)]
pub enum CompilerFault {
    #[error("simulated compiler failure")]
    Simulated,

    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compile task failed: {0}")]
    Task(String),
}
