//! Closest-config resolution and per-watcher event filtering.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use globpack_config::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use parking_lot::RwLock;

use crate::error::Result;

/// Roots and output directories of every live watcher of one session.
///
/// Shared across `watch` calls, so a config watched later still shadows its
/// parent directories for watchers started earlier. Entries disappear when
/// their [`RootRegistration`] is dropped.
#[derive(Debug, Default)]
pub struct RootIndex {
    entries: RwLock<Vec<WatchedRoot>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct WatchedRoot {
    id: u64,
    root: PathBuf,
    output_dirs: Vec<PathBuf>,
}

impl RootIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watched root; it stays registered while the returned guard lives.
    pub fn register(self: &Arc<Self>, root: PathBuf, output_dirs: Vec<PathBuf>) -> RootRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(WatchedRoot {
            id,
            root,
            output_dirs,
        });
        RootRegistration {
            index: Arc::clone(self),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Root dir that is the deepest ancestor of `path`.
    ///
    /// Containment is by path components, so `/a/app` does not contain
    /// `/a/app2/x`. Configs sharing a directory share the result.
    pub fn closest(&self, path: &Path) -> Option<PathBuf> {
        self.entries
            .read()
            .iter()
            .map(|entry| &entry.root)
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned()
    }

    /// Whether `path` lies in any watcher's output directory.
    pub fn is_output(&self, path: &Path) -> bool {
        self.entries
            .read()
            .iter()
            .flat_map(|entry| &entry.output_dirs)
            .any(|dir| path.starts_with(dir))
    }

    fn remove(&self, id: u64) {
        self.entries.write().retain(|entry| entry.id != id);
    }
}

/// Keeps one root in a [`RootIndex`]; removes it on drop.
#[derive(Debug)]
pub struct RootRegistration {
    index: Arc<RootIndex>,
    id: u64,
}

impl Drop for RootRegistration {
    fn drop(&mut self) {
        self.index.remove(self.id);
    }
}

/// Decides whether a change belongs to one watcher.
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    index: Arc<RootIndex>,
    ignored: GlobSet,
}

impl EventFilter {
    /// `ignored` globs are matched against paths relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid ignore pattern.
    pub fn new(
        root: PathBuf,
        index: Arc<RootIndex>,
        ignored: &[String],
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in ignored {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.kind().to_string(),
                })?;
            builder.add(glob);
        }
        let ignored = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: ignored.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root,
            index,
            ignored,
        })
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.index.closest(path).as_deref() != Some(self.root.as_path()) {
            return false;
        }

        // Our own output would otherwise trigger endless rebuilds.
        if self.index.is_output(path) {
            return false;
        }

        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let excluded = relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.') || name == "node_modules"
            }
            _ => false,
        });
        if excluded {
            return false;
        }

        !self.ignored.is_match(relative)
    }
}
