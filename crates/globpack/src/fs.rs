//! Output filesystems compilers write into.
//!
//! `DiskFs` writes through tokio to the real filesystem. `MemoryFs` keeps
//! every written file in a map so a compile never touches the disk.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where compile output goes.
#[async_trait]
pub trait OutputFileSystem: Send + Sync + std::fmt::Debug {
    /// Create `path` and all missing parents.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Write `content` to `path`, replacing any previous content.
    async fn write_file(&self, path: &Path, content: &[u8]) -> std::io::Result<()>;

    /// Read a previously written file.
    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Whether writes land on the real filesystem.
    fn is_disk(&self) -> bool;
}

/// Writes to the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

#[async_trait]
impl OutputFileSystem for DiskFs {
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, content).await
    }

    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    fn is_disk(&self) -> bool {
        true
    }
}

/// In-process filesystem backed by a map of normalized paths.
///
/// Cloning shares the underlying storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every stored file, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains_key(&path.clean())
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl OutputFileSystem for MemoryFs {
    async fn create_dir_all(&self, _path: &Path) -> std::io::Result<()> {
        // Directories are implied by file paths.
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        self.files.write().insert(path.clean(), content.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files
            .read()
            .get(&path.clean())
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found in memory filesystem", path.display()),
                )
            })
    }

    fn is_disk(&self) -> bool {
        false
    }
}
