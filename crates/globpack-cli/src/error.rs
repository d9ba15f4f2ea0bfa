//! Error handling for the globpack CLI.
//!
//! Commands return [`CliError`]; `main` turns it into a `miette` report with
//! a hint where one helps.

use std::path::PathBuf;

use globpack::{ConfigError, Error as GlobpackError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Resolving, compiling or watching configs failed.
    #[error(transparent)]
    Globpack(#[from] GlobpackError),

    /// Loading the `--override` file failed.
    #[error("Override error: {0}")]
    Override(#[from] ConfigError),

    /// Layered option loading failed.
    #[error("Invalid options: {0}")]
    Settings(#[from] Box<figment::Error>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::Settings(Box::new(err))
    }
}

/// Convert a CLI error into a `miette` report.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Globpack(GlobpackError::Config(ConfigError::NotFound(path))) => miette::miette!(
            help = "Check the pattern, or quote it so the shell does not expand it",
            "Config not found: {}",
            path.display()
        ),
        CliError::Globpack(GlobpackError::Config(ConfigError::InvalidShape { path, found })) => {
            miette::miette!(
                help = "A config must hold an object or a non-empty array of objects",
                "{} exports {}",
                path.display(),
                found
            )
        }
        CliError::Globpack(GlobpackError::CompileWarning { config, count }) => miette::miette!(
            help = "Drop --fail-on to treat warnings as non-fatal",
            "{} produced {} warning(s)",
            config.display(),
            count
        ),
        CliError::Globpack(GlobpackError::WatchSetup { root, reason }) => miette::miette!(
            help = "Check that the directory exists and the watch limit is not exhausted",
            "Cannot watch {}: {}",
            root.display(),
            reason
        ),
        CliError::Settings(err) => miette::miette!(
            help = "Check globpack.options.json and GLOBPACK_* environment variables",
            "Invalid options: {}",
            err
        ),
        other => miette::miette!("{}", other),
    }
}
