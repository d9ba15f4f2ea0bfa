//! Sources of file change notifications.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A stream of changed paths under one root.
///
/// Dropping the subscription stops the underlying watch.
pub struct ChangeSubscription {
    receiver: mpsc::UnboundedReceiver<PathBuf>,
    _guard: Box<dyn Any + Send>,
}

impl ChangeSubscription {
    /// Wrap a receiver together with whatever keeps its sender alive.
    pub fn new(receiver: mpsc::UnboundedReceiver<PathBuf>, guard: impl Any + Send) -> Self {
        Self {
            receiver,
            _guard: Box::new(guard),
        }
    }

    /// Next changed path, or `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.receiver.recv().await
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}

/// Provides change subscriptions rooted at a directory.
pub trait ChangeDetector: Send + Sync + fmt::Debug {
    /// Subscribe to changes anywhere below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WatchSetup`] when `root` cannot be watched.
    fn watch(&self, root: &Path) -> Result<ChangeSubscription>;
}

/// Native filesystem notifications through `notify`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyDetector;

impl ChangeDetector for NotifyDetector {
    fn watch(&self, root: &Path) -> Result<ChangeSubscription> {
        let setup_error = |reason: String| Error::WatchSetup {
            root: root.to_path_buf(),
            reason,
        };

        if !root.is_dir() {
            return Err(setup_error("not a directory".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    for path in event.paths {
                        // Receiver gone means the subscription was dropped.
                        let _ = tx.send(path);
                    }
                }
                Err(err) => tracing::warn!(%err, "file watcher error"),
            }
        })
        .map_err(|e| setup_error(e.to_string()))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| setup_error(e.to_string()))?;

        tracing::debug!(root = %root.display(), "watching directory");
        Ok(ChangeSubscription::new(rx, watcher))
    }
}

/// In-process change source driven by [`ManualDetector::emit`].
///
/// Clones share subscribers, so a clone handed to the orchestrator can be
/// driven from the caller's copy.
#[derive(Debug, Default, Clone)]
pub struct ManualDetector {
    subscribers: Arc<Mutex<Vec<(PathBuf, mpsc::UnboundedSender<PathBuf>)>>>,
}

impl ManualDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a change of `path` to every live subscription whose root
    /// contains it. Returns how many subscriptions received it.
    pub fn emit(&self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, tx)| !tx.is_closed());

        subscribers
            .iter()
            .filter(|(root, _)| path.starts_with(root))
            .filter(|(_, tx)| tx.send(path.to_path_buf()).is_ok())
            .count()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }
}

impl ChangeDetector for ManualDetector {
    fn watch(&self, root: &Path) -> Result<ChangeSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((root.to_path_buf(), tx));
        Ok(ChangeSubscription::new(rx, ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_emit_reaches_matching_roots_only() {
        let detector = ManualDetector::new();
        let mut app = detector.watch(Path::new("/repo/app")).unwrap();
        let mut other = detector.watch(Path::new("/repo/app2")).unwrap();

        assert_eq!(detector.emit("/repo/app/src/index.js"), 1);
        assert_eq!(app.recv().await, Some(PathBuf::from("/repo/app/src/index.js")));

        // Component-wise containment: /repo/app is not a prefix of /repo/app2.
        assert_eq!(detector.emit("/repo/app2/index.js"), 1);
        assert_eq!(other.recv().await, Some(PathBuf::from("/repo/app2/index.js")));
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let detector = ManualDetector::new();
        let subscription = detector.watch(Path::new("/repo")).unwrap();
        assert_eq!(detector.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(detector.subscriber_count(), 0);
        assert_eq!(detector.emit("/repo/a.js"), 0);
    }

    #[test]
    fn notify_rejects_missing_root() {
        let err = NotifyDetector
            .watch(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, Error::WatchSetup { .. }));
    }
}
