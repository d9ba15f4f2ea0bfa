//! Command-line interface definition.
//!
//! - `globpack build <patterns>...` compiles every matched config once
//! - `globpack watch <patterns>...` recompiles matched configs on change

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Build or watch many bundler configs at once
#[derive(Parser, Debug)]
#[command(
    name = "globpack",
    version,
    about = "Build or watch many bundler configs at once",
    long_about = "globpack discovers bundler configs through glob patterns, compiles them\n\
                  concurrently and reports one aggregate result. In watch mode a change\n\
                  rebuilds only the config whose directory is closest to the changed file."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all logging except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile every matched config once
    ///
    /// Exits non-zero when any config fails to load or compile.
    Build(RunArgs),

    /// Compile matched configs and recompile them on change
    ///
    /// Runs until interrupted with Ctrl+C.
    Watch(RunArgs),
}

/// Arguments shared by `build` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Config files or glob patterns
    ///
    /// Examples:
    ///   globpack build 'packages/*/globpack.json'
    ///   globpack watch apps/web/globpack.json 'libs/**/globpack.toml'
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Simulate compiles without running the bundler
    #[arg(long)]
    pub dry_run: bool,

    /// Make simulated compiles fail
    #[arg(long, requires = "dry_run")]
    pub failures: bool,

    /// Keep compiled output in memory instead of writing it
    #[arg(long)]
    pub memory_fs: bool,

    /// Treat warnings as failures
    #[arg(long)]
    pub fail_on: bool,

    /// Print nothing but errors
    #[arg(long)]
    pub silent: bool,

    /// Print progress while compiling
    #[arg(long)]
    pub progress: bool,

    /// Write stats.json next to each config's output
    #[arg(long)]
    pub json: bool,

    /// JSON or TOML file merged into every config
    #[arg(long = "override", value_name = "FILE")]
    pub r#override: Option<PathBuf>,

    /// Set a config value in every config, e.g. output.path=build
    ///
    /// Values are parsed as JSON when possible, otherwise taken as strings.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Watch coalescing window in milliseconds
    #[arg(long, value_name = "MS")]
    pub aggregate_timeout: Option<u64>,

    /// Directory patterns are resolved against
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}
