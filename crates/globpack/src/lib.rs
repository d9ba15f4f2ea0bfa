//! # globpack
//!
//! Build or watch many bundler configs at once. Configs are discovered by
//! glob patterns, compiled concurrently, and their outcomes reconciled into a
//! single result:
//!
//! - [`Globpack::run`] compiles every config once and resolves with the stats
//!   of each, in discovery order, or rejects with the first fatal compile.
//! - [`Globpack::watch`] keeps a watcher per config and recompiles only the
//!   config whose directory is closest to a changed file.
//!
//! Per-config outcomes are reported through an optional [`Callback`].

mod adapter;
pub mod compiler;
pub mod error;
pub mod escalation;
pub mod fs;
pub mod options;
pub mod output;
pub mod run;
pub mod stats;
pub mod watch;

use std::sync::Arc;

pub use adapter::Globpack;
pub use compiler::{CompileContext, Compiler, CompilerHandle, CompilerPool, ProgressEvent};
pub use error::{CompilerFault, Error, Result};
pub use escalation::{BuildResult, Escalation};
pub use fs::{DiskFs, MemoryFs, OutputFileSystem};
pub use options::GlobpackOptions;
pub use output::{OutputController, Sink};
pub use run::{RunOrchestrator, STATS_FILE};
pub use stats::{AssetStats, Stats, StatsOptions};
pub use watch::{
    ChangeDetector, ChangeSubscription, ManualDetector, NotifyDetector, WatchOrchestrator,
    WatcherHandle,
};

pub use globpack_config::{ConfigDescriptor, ConfigError, ConfigResolver, ConfigSource};

/// Per-config completion callback: `(error, stats)`.
///
/// `error` is set when the compile is fatal under the escalation policy.
/// `stats` is missing only when the compiler itself faulted.
pub type Callback = Arc<dyn Fn(Option<&Error>, Option<&Stats>) + Send + Sync>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(Option<&Error>, Option<&Stats>) + Send + Sync + 'static,
{
    Arc::new(f)
}
