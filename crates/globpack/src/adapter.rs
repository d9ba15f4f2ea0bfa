use std::path::{Path, PathBuf};
use std::sync::Arc;

use globpack_config::{ConfigDescriptor, ConfigResolver, ConfigSource};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::compiler::CompilerPool;
use crate::error::{Error, Result};
use crate::options::GlobpackOptions;
use crate::output::{OutputController, Sink};
use crate::run::{Reporter, RunOrchestrator};
use crate::stats::Stats;
use crate::watch::{ChangeDetector, NotifyDetector, RootIndex, WatchOrchestrator, WatcherHandle};
use crate::Callback;

/// Entry point for building or watching many configs at once.
///
/// # Example
///
/// ```no_run
/// use globpack::{Globpack, GlobpackOptions};
///
/// # async fn demo() -> globpack::Result<()> {
/// let globpack = Globpack::new(GlobpackOptions::default());
/// let stats = globpack.run(["packages/*/globpack.json"], None).await?;
/// for (config, stats) in &stats {
///     println!("{}: {} asset(s)", config.display(), stats.assets.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Globpack {
    options: GlobpackOptions,
    overrides: Option<Value>,
    cwd: PathBuf,
    output: OutputController,
    detector: Arc<dyn ChangeDetector>,
    roots: Arc<RootIndex>,
    watchers: Mutex<Vec<WatcherHandle>>,
}

impl Globpack {
    pub fn new(options: GlobpackOptions) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let output = OutputController::new(&options);
        Self {
            options,
            overrides: None,
            cwd,
            output,
            detector: Arc::new(NotifyDetector),
            roots: Arc::new(RootIndex::new()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Merge `overrides` into every resolved config.
    pub fn with_override(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Directory relative patterns are resolved against.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_detector(mut self, detector: impl ChangeDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    /// Send console output to `sink` instead of stdout.
    pub fn with_output(mut self, sink: Sink) -> Self {
        self.output = OutputController::with_sink(&self.options, sink);
        self
    }

    pub fn options(&self) -> &GlobpackOptions {
        &self.options
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Compile every matched config once.
    ///
    /// `callback` fires exactly once per config, whatever the overall
    /// outcome.
    ///
    /// # Errors
    ///
    /// Rejects on config resolution failures before compiling anything, and
    /// with the first fatal compile (in config order) after all compiles
    /// finish.
    pub async fn run<I, S>(&self, sources: I, callback: Option<Callback>) -> Result<IndexMap<PathBuf, Stats>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ConfigSource>,
    {
        let descriptors = self.resolve(sources)?;
        let orchestrator = RunOrchestrator::new(
            CompilerPool::new(&self.options),
            Reporter::new(&self.options, self.output.clone(), callback),
        );
        orchestrator.run(descriptors).await
    }

    /// Start a watcher per matched config.
    ///
    /// Watchers are also tracked here so [`Globpack::close_all`] can stop
    /// them. Closest-config routing spans every watcher of this instance,
    /// including those from earlier calls.
    ///
    /// # Errors
    ///
    /// Rejects on config resolution or watch setup failures. Compile failures
    /// only reach `callback`.
    pub async fn watch<I, S>(&self, sources: I, callback: Option<Callback>) -> Result<Vec<WatcherHandle>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ConfigSource>,
    {
        let descriptors = self.resolve(sources)?;
        let orchestrator = WatchOrchestrator::new(
            CompilerPool::new(&self.options),
            Reporter::new(&self.options, self.output.clone(), callback),
            Arc::clone(&self.detector),
            Arc::clone(&self.roots),
            self.options.aggregate_timeout(),
        );

        let watchers = orchestrator.watch(descriptors).await?;
        self.watchers.lock().extend(watchers.iter().cloned());
        Ok(watchers)
    }

    /// Close every watcher started through this instance.
    ///
    /// Resolves once every watcher has torn down. Concurrent calls wait for
    /// the same teardowns.
    ///
    /// # Errors
    ///
    /// Returns the first teardown error, after every watcher was closed.
    pub async fn close_all(&self) -> Result<()> {
        // Handles stay listed until their teardown completes.
        let watchers: Vec<WatcherHandle> = self.watchers.lock().clone();
        if watchers.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = watchers.len(), "closing watchers");
        let results = futures::future::join_all(watchers.iter().map(|watcher| watcher.close())).await;
        self.watchers.lock().retain(|watcher| !watcher.is_closed());
        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    fn resolve<I, S>(&self, sources: I) -> Result<Vec<ConfigDescriptor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ConfigSource>,
    {
        if self.options.failures && !self.options.dry_run {
            return Err(Error::InvalidArgument(
                "`failures` only applies to dry runs".to_string(),
            ));
        }

        let mut resolver = ConfigResolver::new(&self.cwd);
        if let Some(overrides) = &self.overrides {
            resolver = resolver.with_override(overrides.clone());
        }

        let descriptors = resolver.resolve(sources)?;
        tracing::debug!(count = descriptors.len(), "resolved configs");
        Ok(descriptors)
    }
}
