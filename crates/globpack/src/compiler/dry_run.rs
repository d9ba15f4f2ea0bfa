use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use globpack_config::ConfigDescriptor;
use path_clean::PathClean;
use serde_json::Value;

use super::{CompileContext, Compiler};
use crate::error::CompilerFault;
use crate::fs::OutputFileSystem;
use crate::stats::{content_hash, now_millis, Stats};

/// Simulated compiler that never runs the bundler.
///
/// The outcome depends only on `failures`: a fault when set, empty successful
/// stats otherwise.
#[derive(Debug)]
pub struct DryRunCompiler {
    config: PathBuf,
    name: Option<String>,
    output_path: PathBuf,
    output_fs: Arc<dyn OutputFileSystem>,
    failures: bool,
}

impl DryRunCompiler {
    pub fn new(
        descriptor: &ConfigDescriptor,
        output_fs: Arc<dyn OutputFileSystem>,
        failures: bool,
    ) -> Self {
        let first = match &descriptor.merged_config {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };

        // Configs are not schema-checked in a dry run, so read what is there.
        let output_path = first
            .pointer("/output/path")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dist"));
        let output_path = if output_path.is_absolute() {
            output_path.clean()
        } else {
            descriptor.root_dir.join(output_path).clean()
        };

        Self {
            config: descriptor.path.clone(),
            name: first.get("name").and_then(Value::as_str).map(str::to_string),
            output_path,
            output_fs,
            failures,
        }
    }
}

#[async_trait]
impl Compiler for DryRunCompiler {
    async fn compile(&self, ctx: &CompileContext) -> Result<Stats, CompilerFault> {
        let start = Instant::now();
        ctx.report(&self.config, 0.0, "compiling (dry run)");
        tokio::task::yield_now().await;

        if self.failures {
            ctx.report(&self.config, 1.0, "failed (dry run)");
            return Err(CompilerFault::Simulated);
        }

        ctx.report(&self.config, 1.0, "done (dry run)");
        Ok(Stats {
            config: self.config.clone(),
            name: self.name.clone(),
            hash: content_hash([self.config.as_os_str().as_encoded_bytes()]),
            time: start.elapsed().as_millis() as u64,
            built_at: now_millis(),
            output_path: self.output_path.clone(),
            ..Stats::default()
        })
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn output_fs(&self) -> Arc<dyn OutputFileSystem> {
        Arc::clone(&self.output_fs)
    }
}
