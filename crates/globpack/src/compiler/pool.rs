use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use globpack_config::{ConfigDescriptor, WatchOptions};
use tracing::Instrument;

use super::{BundleCompiler, CompileContext, Compiler, DryRunCompiler};
use crate::error::{CompilerFault, Result};
use crate::fs::{DiskFs, MemoryFs, OutputFileSystem};
use crate::options::GlobpackOptions;
use crate::stats::Stats;

/// Builds one compiler per descriptor from the session options.
#[derive(Debug, Clone, Copy)]
pub struct CompilerPool {
    dry_run: bool,
    failures: bool,
    memory_fs: bool,
}

impl CompilerPool {
    pub fn new(options: &GlobpackOptions) -> Self {
        Self {
            dry_run: options.dry_run,
            failures: options.failures,
            memory_fs: options.memory_fs,
        }
    }

    /// Build the compiler for `descriptor`.
    ///
    /// Dry runs never parse the config beyond the fields they read; the real
    /// bundler validates every target first.
    ///
    /// # Errors
    ///
    /// Returns a config error when the bundler rejects the config.
    pub fn build(&self, descriptor: Arc<ConfigDescriptor>) -> Result<CompilerHandle> {
        let memory = self.memory_fs.then(MemoryFs::new);
        let output_fs: Arc<dyn OutputFileSystem> = match &memory {
            Some(memory) => Arc::new(memory.clone()),
            None => Arc::new(DiskFs),
        };

        let compiler: Arc<dyn Compiler> = if self.dry_run {
            Arc::new(DryRunCompiler::new(&descriptor, output_fs, self.failures))
        } else {
            Arc::new(BundleCompiler::new(&descriptor, output_fs)?)
        };

        tracing::debug!(
            config = %descriptor.path.display(),
            dry_run = self.dry_run,
            memory_fs = self.memory_fs,
            "compiler ready"
        );

        Ok(CompilerHandle {
            descriptor,
            compiler,
            memory,
        })
    }
}

/// A descriptor paired with the compiler built for it.
///
/// Cloning is cheap and shares the compiler.
#[derive(Debug, Clone)]
pub struct CompilerHandle {
    descriptor: Arc<ConfigDescriptor>,
    compiler: Arc<dyn Compiler>,
    memory: Option<MemoryFs>,
}

impl CompilerHandle {
    pub fn new(descriptor: Arc<ConfigDescriptor>, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            descriptor,
            compiler,
            memory: None,
        }
    }

    pub fn descriptor(&self) -> &ConfigDescriptor {
        &self.descriptor
    }

    pub fn config_path(&self) -> &Path {
        &self.descriptor.path
    }

    pub fn root_dir(&self) -> &Path {
        &self.descriptor.root_dir
    }

    pub fn output_path(&self) -> &Path {
        self.compiler.output_path()
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.compiler.output_paths()
    }

    pub fn output_fs(&self) -> Arc<dyn OutputFileSystem> {
        self.compiler.output_fs()
    }

    /// In-memory output, when the compiler writes to memory.
    pub fn memory_fs(&self) -> Option<&MemoryFs> {
        self.memory.as_ref()
    }

    pub fn watch_options(&self) -> WatchOptions {
        self.compiler.watch_options()
    }

    /// Run one compile.
    pub async fn compile(&self, ctx: &CompileContext) -> std::result::Result<Stats, CompilerFault> {
        let span = tracing::info_span!("compile", config = %self.descriptor.path.display());
        async {
            let start = Instant::now();
            let result = self.compiler.compile(ctx).await;
            match &result {
                Ok(stats) => tracing::debug!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    errors = stats.all_errors().len(),
                    warnings = stats.all_warnings().len(),
                    "compile finished"
                ),
                Err(fault) => tracing::debug!(%fault, "compile faulted"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
