//! Compilers and the pool that builds them.
//!
//! Every compiler reports completion the same way: `Ok(stats)` for a compile
//! that ran (even when the stats carry errors or warnings), `Err(fault)` for a
//! condition the compiler treats as fatal.

mod bundle;
mod dry_run;
mod pool;
#[cfg(test)]
pub(crate) mod testing;

pub use bundle::BundleCompiler;
pub use dry_run::DryRunCompiler;
pub use pool::{CompilerHandle, CompilerPool};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use globpack_config::WatchOptions;

use crate::error::CompilerFault;
use crate::fs::OutputFileSystem;
use crate::stats::{Stats, StatsOptions};

/// A progress report emitted while a compile runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Config being compiled.
    pub config: PathBuf,
    /// Completion in `0.0..=1.0`.
    pub percentage: f32,
    pub message: String,
}

pub type ProgressReporter = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Per-invocation inputs handed to [`Compiler::compile`].
#[derive(Clone)]
pub struct CompileContext {
    pub stats_options: StatsOptions,
    progress: Option<ProgressReporter>,
}

impl CompileContext {
    pub fn new(stats_options: StatsOptions) -> Self {
        Self {
            stats_options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Forward a progress event to the reporter, if any.
    pub fn report(&self, config: &Path, percentage: f32, message: impl Into<String>) {
        if let Some(progress) = &self.progress {
            progress(&ProgressEvent {
                config: config.to_path_buf(),
                percentage,
                message: message.into(),
            });
        }
    }
}

impl fmt::Debug for CompileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileContext")
            .field("stats_options", &self.stats_options)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// One compiler instance bound to one config.
#[async_trait]
pub trait Compiler: Send + Sync + fmt::Debug {
    /// Run a full compile.
    async fn compile(&self, ctx: &CompileContext) -> Result<Stats, CompilerFault>;

    /// Primary output directory (where the stats artifact goes).
    fn output_path(&self) -> &Path;

    /// Every directory this compiler writes into.
    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.output_path().to_path_buf()]
    }

    fn output_fs(&self) -> Arc<dyn OutputFileSystem>;

    /// Watch tuning declared by the config.
    fn watch_options(&self) -> WatchOptions {
        WatchOptions::default()
    }
}
