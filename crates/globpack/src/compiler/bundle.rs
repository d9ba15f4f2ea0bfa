//! The built-in bundler: concatenates entry files into one asset per chunk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use globpack_config::{BundleConfig, ConfigDescriptor, Hints, Mode, WatchOptions};

use super::{CompileContext, Compiler};
use crate::error::{CompilerFault, Result};
use crate::fs::OutputFileSystem;
use crate::stats::{content_hash, now_millis, AssetStats, Stats};

/// Compiler for one config file, which may declare several targets.
#[derive(Debug)]
pub struct BundleCompiler {
    config: PathBuf,
    root_dir: PathBuf,
    targets: Vec<BundleConfig>,
    output_paths: Vec<PathBuf>,
    output_fs: Arc<dyn OutputFileSystem>,
}

struct Emitted {
    asset: AssetStats,
    content: Vec<u8>,
}

impl BundleCompiler {
    /// Parse the descriptor's merged config into typed targets.
    ///
    /// # Errors
    ///
    /// Returns a config error when any target does not match the bundle
    /// schema.
    pub fn new(descriptor: &ConfigDescriptor, output_fs: Arc<dyn OutputFileSystem>) -> Result<Self> {
        let targets = BundleConfig::targets(&descriptor.path, &descriptor.merged_config)?;
        let output_paths = targets
            .iter()
            .map(|target| target.output_dir(&descriptor.root_dir))
            .collect();

        Ok(Self {
            config: descriptor.path.clone(),
            root_dir: descriptor.root_dir.clone(),
            targets,
            output_paths,
            output_fs,
        })
    }

    pub fn targets(&self) -> &[BundleConfig] {
        &self.targets
    }

    async fn compile_target(
        &self,
        target: &BundleConfig,
        output_dir: &Path,
        ctx: &CompileContext,
    ) -> std::result::Result<Stats, CompilerFault> {
        let start = Instant::now();
        let context = target.context_dir(&self.root_dir);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mode = match target.mode {
            Some(mode) => mode,
            None => {
                warnings.push(
                    "configuration\nThe 'mode' option has not been set, globpack will fall back \
                     to 'production' for this value.\nSet 'mode' to 'development' or \
                     'production' to enable defaults for each environment."
                        .to_string(),
                );
                Mode::Production
            }
        };

        let chunks = target.entry.chunks();
        let mut emitted = Vec::with_capacity(chunks.len());

        for (index, (chunk, files)) in chunks.iter().enumerate() {
            let percentage = 0.1 + 0.7 * (index as f32 / chunks.len() as f32);
            ctx.report(&self.config, percentage, format!("building {}", chunk));

            let mut content = Vec::new();
            let mut resolved = true;
            for file in files {
                let path = context.join(file);
                match tokio::fs::read(&path).await {
                    Ok(source) => {
                        content.extend_from_slice(format!("// {}\n", file.display()).as_bytes());
                        content.extend_from_slice(&source);
                        if !source.ends_with(b"\n") {
                            content.push(b'\n');
                        }
                    }
                    Err(err) => {
                        resolved = false;
                        errors.push(format!(
                            "Module not found: Error: Can't resolve '{}' in '{}'\n{}",
                            file.display(),
                            context.display(),
                            err
                        ));
                    }
                }
            }
            if !resolved {
                continue;
            }

            let name = target
                .output
                .filename
                .replace("[name]", chunk)
                .replace("[hash]", &content_hash([content.as_slice()]));
            emitted.push(Emitted {
                asset: AssetStats {
                    name,
                    size: content.len() as u64,
                    chunk: chunk.clone(),
                },
                content,
            });
        }

        let limit = target.performance.max_asset_size();
        let oversized: Vec<&AssetStats> = emitted
            .iter()
            .map(|e| &e.asset)
            .filter(|asset| asset.size > limit)
            .collect();
        if !oversized.is_empty() {
            let listing: Vec<String> = oversized
                .iter()
                .map(|asset| format!("  {} ({} bytes)", asset.name, asset.size))
                .collect();
            let message = format!(
                "asset size limit: The following asset(s) exceed the recommended size limit ({} bytes).\n{}",
                limit,
                listing.join("\n")
            );
            match target.performance.effective_hints(Some(mode)) {
                Hints::Warning => warnings.push(message),
                Hints::Error => errors.push(message),
                Hints::Off => {}
            }
        }

        // Nothing is emitted for a target with errors.
        let assets = if errors.is_empty() && !emitted.is_empty() {
            ctx.report(&self.config, 0.9, format!("emitting to {}", output_dir.display()));
            self.output_fs
                .create_dir_all(output_dir)
                .await
                .map_err(|source| CompilerFault::Output {
                    path: output_dir.to_path_buf(),
                    source,
                })?;
            for item in &emitted {
                let path = output_dir.join(&item.asset.name);
                if let Some(parent) = path.parent() {
                    if parent != output_dir {
                        self.output_fs.create_dir_all(parent).await.map_err(|source| {
                            CompilerFault::Output {
                                path: parent.to_path_buf(),
                                source,
                            }
                        })?;
                    }
                }
                self.output_fs
                    .write_file(&path, &item.content)
                    .await
                    .map_err(|source| CompilerFault::Output { path, source })?;
            }
            emitted.into_iter().map(|e| e.asset).collect()
        } else {
            Vec::new()
        };

        let hash = content_hash(assets.iter().map(|asset: &AssetStats| asset.name.as_bytes()));
        Ok(Stats {
            config: self.config.clone(),
            name: target.name.clone(),
            hash,
            time: start.elapsed().as_millis() as u64,
            built_at: now_millis(),
            output_path: output_dir.to_path_buf(),
            assets,
            errors,
            warnings,
            children: Vec::new(),
        })
    }
}

#[async_trait]
impl Compiler for BundleCompiler {
    async fn compile(&self, ctx: &CompileContext) -> std::result::Result<Stats, CompilerFault> {
        let start = Instant::now();
        ctx.report(&self.config, 0.0, "compiling");

        let mut children = Vec::with_capacity(self.targets.len());
        for (target, output_dir) in self.targets.iter().zip(&self.output_paths) {
            children.push(self.compile_target(target, output_dir, ctx).await?);
        }

        let stats = if children.len() == 1 {
            children.remove(0)
        } else {
            let hash = content_hash(children.iter().map(|child| child.hash.as_bytes()));
            Stats {
                config: self.config.clone(),
                name: None,
                hash,
                time: start.elapsed().as_millis() as u64,
                built_at: now_millis(),
                output_path: self.output_path().to_path_buf(),
                children,
                ..Stats::default()
            }
        };

        ctx.report(&self.config, 1.0, "done");
        Ok(stats)
    }

    fn output_path(&self) -> &Path {
        self.output_paths
            .first()
            .map(PathBuf::as_path)
            .unwrap_or(&self.root_dir)
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        self.output_paths.clone()
    }

    fn output_fs(&self) -> Arc<dyn OutputFileSystem> {
        Arc::clone(&self.output_fs)
    }

    fn watch_options(&self) -> WatchOptions {
        let mut options = WatchOptions::default();
        for target in &self.targets {
            if options.aggregate_timeout.is_none() {
                options.aggregate_timeout = target.watch_options.aggregate_timeout;
            }
            options
                .ignored
                .extend(target.watch_options.ignored.iter().cloned());
        }
        options
    }
}
