//! globpack CLI.
//!
//! - [`cli`] - argument definitions
//! - [`settings`] - layered session options (defaults, file, env, flags)
//! - [`overrides`] - the `--override`/`--set` value merged into every config
//! - [`logger`] - tracing subscriber setup
//! - `commands` - `build` and `watch`

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod overrides;
pub mod settings;
pub mod ui;

pub use error::{CliError, Result};
