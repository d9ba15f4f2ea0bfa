//! Continuous recompilation driven by file changes.
//!
//! Each config gets its own long-lived task holding its compiler and its
//! change subscription. A change is routed to exactly the watcher whose config
//! directory is the closest ancestor of the changed path.

mod closest;
mod detector;

pub use closest::{EventFilter, RootIndex, RootRegistration};
pub use detector::{ChangeDetector, ChangeSubscription, ManualDetector, NotifyDetector};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use globpack_config::ConfigDescriptor;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OnceCell, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::compiler::{CompileContext, CompilerHandle, CompilerPool};
use crate::error::{Error, Result};
use crate::run::Reporter;

/// Handle to one running watcher.
///
/// Clones refer to the same watcher.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    inner: Arc<WatcherInner>,
}

#[derive(Debug)]
struct WatcherInner {
    descriptor: Arc<ConfigDescriptor>,
    closed: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: AsyncMutex<Option<JoinHandle<()>>>,
    teardown: OnceCell<std::result::Result<(), String>>,
}

impl WatcherHandle {
    pub fn descriptor(&self) -> &ConfigDescriptor {
        &self.inner.descriptor
    }

    pub fn config_path(&self) -> &Path {
        &self.inner.descriptor.path
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop watching and wait for the watcher to tear down.
    ///
    /// A compile already running finishes first. Concurrent and repeated
    /// calls all wait for the same teardown and share its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Teardown`] when the watch task panicked.
    pub async fn close(&self) -> Result<()> {
        let outcome = self
            .inner
            .teardown
            .get_or_init(|| self.inner.tear_down())
            .await;
        outcome.clone().map_err(|reason| Error::Teardown {
            config: self.config_path().to_path_buf(),
            reason,
        })
    }
}

impl WatcherInner {
    async fn tear_down(&self) -> std::result::Result<(), String> {
        self.closed.store(true, Ordering::SeqCst);

        let shutdown = self.shutdown.lock().take();
        if let Some(shutdown) = shutdown {
            // The task may already be gone.
            let _ = shutdown.send(());
        }

        // The handle stays in place until joined, so a cancelled close
        // leaves it for the next caller.
        let mut task = self.task.lock().await;
        let outcome = match task.as_mut() {
            Some(handle) => match handle.await {
                Err(join_err) if join_err.is_panic() => Err(join_err.to_string()),
                _ => Ok(()),
            },
            None => Ok(()),
        };
        *task = None;

        tracing::debug!(config = %self.descriptor.path.display(), "watcher closed");
        outcome
    }
}

/// Starts one watcher per descriptor.
pub struct WatchOrchestrator {
    pool: CompilerPool,
    reporter: Reporter,
    detector: Arc<dyn ChangeDetector>,
    index: Arc<RootIndex>,
    default_window: Duration,
}

impl WatchOrchestrator {
    pub(crate) fn new(
        pool: CompilerPool,
        reporter: Reporter,
        detector: Arc<dyn ChangeDetector>,
        index: Arc<RootIndex>,
        default_window: Duration,
    ) -> Self {
        Self {
            pool,
            reporter,
            detector,
            index,
            default_window,
        }
    }

    /// Start watching every descriptor.
    ///
    /// Resolves once every watcher finished its initial compile. Compile
    /// failures never reject this future; they reach the callback.
    ///
    /// # Errors
    ///
    /// Fails when a compiler cannot be built, an ignore pattern is invalid or
    /// a directory cannot be watched. Watchers started before the failure are
    /// closed first.
    pub async fn watch(&self, descriptors: Vec<ConfigDescriptor>) -> Result<Vec<WatcherHandle>> {
        let handles = descriptors
            .into_iter()
            .map(|descriptor| self.pool.build(Arc::new(descriptor)))
            .collect::<Result<Vec<_>>>()?;
        self.watch_handles(handles).await
    }

    /// Start a watcher for each already built compiler.
    pub(crate) async fn watch_handles(
        &self,
        handles: Vec<CompilerHandle>,
    ) -> Result<Vec<WatcherHandle>> {
        // Register every root before any watcher starts filtering.
        let registrations: Vec<RootRegistration> = handles
            .iter()
            .map(|handle| {
                self.index
                    .register(handle.root_dir().to_path_buf(), handle.output_paths())
            })
            .collect();

        let ctx = self.reporter.context();
        let mut watchers = Vec::with_capacity(handles.len());
        let mut ready = Vec::with_capacity(handles.len());

        for (handle, registration) in handles.into_iter().zip(registrations) {
            match self.start(handle, registration, &ctx) {
                Ok((watcher, started)) => {
                    watchers.push(watcher);
                    ready.push(started);
                }
                Err(err) => {
                    for watcher in &watchers {
                        if let Err(close_err) = watcher.close().await {
                            tracing::warn!(%close_err, "failed to close watcher after setup error");
                        }
                    }
                    return Err(err);
                }
            }
        }

        for started in ready {
            // An error here means the task died, which close() reports.
            let _ = started.await;
        }

        self.reporter
            .output()
            .notice(&format!("watching {} config(s)", watchers.len()));
        Ok(watchers)
    }

    fn start(
        &self,
        handle: CompilerHandle,
        registration: RootRegistration,
        ctx: &CompileContext,
    ) -> Result<(WatcherHandle, oneshot::Receiver<()>)> {
        let watch_options = handle.watch_options();
        let filter = EventFilter::new(
            handle.root_dir().to_path_buf(),
            Arc::clone(&self.index),
            &watch_options.ignored,
        )?;
        let window = watch_options
            .aggregate_timeout
            .map(Duration::from_millis)
            .unwrap_or(self.default_window);

        let subscription = self.detector.watch(handle.root_dir())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let descriptor = Arc::new(handle.descriptor().clone());

        let task = WatchTask {
            handle,
            reporter: self.reporter.clone(),
            ctx: ctx.clone(),
            subscription,
            filter,
            window,
            _registration: registration,
        };
        let join = tokio::spawn(task.run(ready_tx, shutdown_rx));

        tracing::debug!(
            config = %descriptor.path.display(),
            window_ms = window.as_millis() as u64,
            "watcher started"
        );

        let watcher = WatcherHandle {
            inner: Arc::new(WatcherInner {
                descriptor,
                closed: AtomicBool::new(false),
                shutdown: Mutex::new(Some(shutdown_tx)),
                task: AsyncMutex::new(Some(join)),
                teardown: OnceCell::new(),
            }),
        };
        Ok((watcher, ready_rx))
    }
}

struct WatchTask {
    handle: CompilerHandle,
    reporter: Reporter,
    ctx: CompileContext,
    subscription: ChangeSubscription,
    filter: EventFilter,
    window: Duration,
    _registration: RootRegistration,
}

impl WatchTask {
    async fn run(mut self, ready: oneshot::Sender<()>, mut shutdown: oneshot::Receiver<()>) {
        self.reporter.compile(&self.handle, &self.ctx).await;
        let _ = ready.send(());

        'watch: loop {
            let first = tokio::select! {
                _ = &mut shutdown => break 'watch,
                event = self.subscription.recv() => match event {
                    Some(path) => path,
                    None => break 'watch,
                },
            };
            if !self.filter.accepts(&first) {
                continue;
            }
            tracing::debug!(path = %first.display(), "change detected");

            // Coalesce until the window passes without another accepted change.
            let mut deadline = Instant::now() + self.window;
            let mut coalesced = 1usize;
            loop {
                tokio::select! {
                    _ = &mut shutdown => break 'watch,
                    event = tokio::time::timeout_at(deadline, self.subscription.recv()) => match event {
                        Ok(Some(path)) => {
                            if self.filter.accepts(&path) {
                                coalesced += 1;
                                deadline = Instant::now() + self.window;
                            }
                        }
                        Ok(None) | Err(_) => break,
                    },
                }
            }

            tracing::debug!(
                config = %self.handle.config_path().display(),
                changes = coalesced,
                "recompiling"
            );
            self.reporter.compile(&self.handle, &self.ctx).await;
        }
    }
}
