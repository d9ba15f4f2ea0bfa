//! Compilers with controllable timing for watcher tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use globpack_config::ConfigDescriptor;
use serde_json::json;

use super::{CompileContext, Compiler, CompilerHandle};
use crate::error::CompilerFault;
use crate::fs::{MemoryFs, OutputFileSystem};
use crate::stats::Stats;

/// Compiles instantly the first time, then takes `delay` per compile.
#[derive(Debug)]
pub(crate) struct SlowCompiler {
    config: PathBuf,
    output_path: PathBuf,
    delay: Duration,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl SlowCompiler {
    pub(crate) fn handle(config: &str, delay: Duration) -> (CompilerHandle, Arc<SlowCompiler>) {
        let config = PathBuf::from(config);
        let descriptor = ConfigDescriptor::new(
            config.clone(),
            json!({ "entry": "./index.js" }),
            json!({ "entry": "./index.js" }),
        );
        let output_path = descriptor.root_dir.join("dist");
        let compiler = Arc::new(SlowCompiler {
            config,
            output_path,
            delay,
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        });
        let handle = CompilerHandle::new(Arc::new(descriptor), compiler.clone());
        (handle, compiler)
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait until `count` compiles have started.
    pub(crate) async fn wait_started(&self, count: usize) {
        while self.started() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Compiler for SlowCompiler {
    async fn compile(&self, _ctx: &CompileContext) -> Result<Stats, CompilerFault> {
        if self.started.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(self.delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(Stats {
            config: self.config.clone(),
            output_path: self.output_path.clone(),
            ..Stats::default()
        })
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn output_fs(&self) -> Arc<dyn OutputFileSystem> {
        Arc::new(MemoryFs::new())
    }
}
