//! Shared helpers for globpack integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globpack::{callback, Callback, Sink};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// One callback invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub config: Option<PathBuf>,
    pub error: Option<String>,
    pub has_errors: bool,
    pub has_warnings: bool,
}

/// Callback that forwards every invocation to a channel.
pub fn recorder() -> (Callback, mpsc::UnboundedReceiver<Call>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cb = callback(move |error, stats| {
        let config = stats
            .map(|stats| stats.config.clone())
            .or_else(|| error.and_then(|e| e.config_path()).map(Path::to_path_buf));
        let _ = tx.send(Call {
            config,
            error: error.map(|e| e.to_string()),
            has_errors: stats.is_some_and(|s| s.has_errors()),
            has_warnings: stats.is_some_and(|s| s.has_warnings()),
        });
    });
    (cb, rx)
}

/// Everything received so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Call>) -> Vec<Call> {
    let mut calls = Vec::new();
    while let Ok(call) = rx.try_recv() {
        calls.push(call);
    }
    calls
}

/// Console sink backed by a buffer.
pub fn capture() -> (Sink, Arc<Mutex<Vec<u8>>>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink: Sink = buffer.clone();
    (sink, buffer)
}

pub fn captured_text(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&buffer.lock()).into_owned()
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A temporary monorepo with one package per name under `packages/`.
pub struct Workspace {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        Self { _temp: temp, root }
    }

    /// Write `packages/<name>/globpack.json` and a matching `index.js`.
    pub fn package(&self, name: &str, config: serde_json::Value) -> PathBuf {
        self.package_at(&format!("packages/{}", name), config)
    }

    pub fn package_at(&self, relative: &str, config: serde_json::Value) -> PathBuf {
        let dir = self.root.join(relative);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("index.js"),
            format!("export const name = '{}';\n", relative),
        )
        .unwrap();
        let path = dir.join("globpack.json");
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        path
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}
