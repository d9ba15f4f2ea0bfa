//! Command implementations.
//!
//! - [`build`] compiles every matched config once
//! - [`watch`] recompiles matched configs on change until interrupted

pub mod build;
pub mod watch;

pub use build::execute as build_execute;
pub use watch::execute as watch_execute;

use std::path::PathBuf;

use globpack::Globpack;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::overrides::build_override;
use crate::settings::load_options;

/// Set up a session from the shared arguments.
pub(crate) fn prepare(args: &RunArgs, colors: bool) -> Result<Globpack> {
    let current = std::env::current_dir()?;
    let cwd: PathBuf = match &args.cwd {
        Some(dir) => current.join(dir),
        None => current,
    };
    if !cwd.is_dir() {
        return Err(CliError::DirectoryNotFound(cwd));
    }

    let options = load_options(args, &cwd, colors)?;
    let overrides = build_override(&cwd, args.r#override.as_deref(), &args.set)?;

    let globpack = Globpack::new(options).with_cwd(cwd);
    Ok(match overrides {
        Some(overrides) => globpack.with_override(overrides),
        None => globpack,
    })
}
