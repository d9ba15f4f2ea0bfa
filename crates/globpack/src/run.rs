//! One-shot compilation of every resolved config.

use std::path::PathBuf;
use std::sync::Arc;

use globpack_config::ConfigDescriptor;
use indexmap::IndexMap;
use tokio::task::JoinSet;

use crate::compiler::{CompileContext, CompilerHandle, CompilerPool};
use crate::error::{CompilerFault, Error, Result};
use crate::escalation::{BuildResult, Escalation};
use crate::options::GlobpackOptions;
use crate::output::OutputController;
use crate::stats::{Stats, StatsOptions};
use crate::Callback;

/// File name of the persisted stats artifact.
pub const STATS_FILE: &str = "stats.json";

/// Everything that happens after a compile completes: escalation, the stats
/// artifact, console output and the caller's callback. Shared by run and
/// watch mode.
#[derive(Clone)]
pub(crate) struct Reporter {
    escalation: Escalation,
    json: bool,
    stats_options: StatsOptions,
    output: OutputController,
    callback: Option<Callback>,
}

impl Reporter {
    pub(crate) fn new(
        options: &GlobpackOptions,
        output: OutputController,
        callback: Option<Callback>,
    ) -> Self {
        Self {
            escalation: Escalation::new(options.fail_on),
            json: options.json,
            stats_options: options.stats,
            output,
            callback,
        }
    }

    pub(crate) fn output(&self) -> &OutputController {
        &self.output
    }

    /// Compile context wired to this reporter's progress output.
    pub(crate) fn context(&self) -> CompileContext {
        let ctx = CompileContext::new(self.stats_options);
        if self.output.wants_progress() {
            let output = self.output.clone();
            ctx.with_progress(Arc::new(move |event| output.progress(event)))
        } else {
            ctx
        }
    }

    /// Compile `handle` once and report the outcome.
    ///
    /// Returns the result and the fatal error, if the outcome escalated.
    pub(crate) async fn compile(
        &self,
        handle: &CompilerHandle,
        ctx: &CompileContext,
    ) -> (BuildResult, Option<Error>) {
        let completion = handle.compile(ctx).await;
        let result = BuildResult::from_completion(handle.config_path().to_path_buf(), completion);
        let mut fatal = self.escalation.evaluate(&result);

        if let Some(stats) = &result.stats {
            if self.json && fatal.is_none() {
                if let Err(err) = self.write_stats(handle, stats).await {
                    fatal = Some(err);
                }
            }
            self.output.summary(stats);
        }

        if let Some(err) = &fatal {
            tracing::debug!(config = %handle.config_path().display(), %err, "compile is fatal");
        }
        if let Some(callback) = &self.callback {
            callback(fatal.as_ref(), result.stats.as_ref());
        }

        (result, fatal)
    }

    async fn write_stats(&self, handle: &CompilerHandle, stats: &Stats) -> Result<()> {
        let dir = handle.output_path();
        let document = stats.to_json(&self.stats_options.without_colors());
        let bytes = serde_json::to_vec_pretty(&document)?;

        let fs = handle.output_fs();
        fs.create_dir_all(dir).await?;
        fs.write_file(&dir.join(STATS_FILE), &bytes).await?;
        Ok(())
    }
}

/// Compiles a set of descriptors concurrently and settles once all finish.
pub struct RunOrchestrator {
    pool: CompilerPool,
    reporter: Reporter,
}

impl RunOrchestrator {
    pub(crate) fn new(pool: CompilerPool, reporter: Reporter) -> Self {
        Self { pool, reporter }
    }

    /// Compile every descriptor once.
    ///
    /// Every compile runs to completion and calls back exactly once, even
    /// when a sibling fails.
    ///
    /// # Errors
    ///
    /// Fails before compiling anything when a compiler cannot be built.
    /// After compiling, returns the fatal error of the first failing
    /// descriptor in descriptor order.
    pub async fn run(&self, descriptors: Vec<ConfigDescriptor>) -> Result<IndexMap<PathBuf, Stats>> {
        let handles = descriptors
            .into_iter()
            .map(|descriptor| self.pool.build(Arc::new(descriptor)))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(count = handles.len(), "starting compiles");

        let ctx = self.reporter.context();
        let mut join_set = JoinSet::new();
        for (index, handle) in handles.iter().enumerate() {
            let handle = handle.clone();
            let reporter = self.reporter.clone();
            let ctx = ctx.clone();
            join_set.spawn(async move {
                let (result, fatal) = reporter.compile(&handle, &ctx).await;
                (index, result, fatal)
            });
        }

        let mut outcomes: Vec<Option<(BuildResult, Option<Error>)>> =
            handles.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result, fatal)) => outcomes[index] = Some((result, fatal)),
                Err(join_err) => tracing::warn!(%join_err, "compile task failed"),
            }
        }

        let mut mapping = IndexMap::with_capacity(handles.len());
        for (handle, outcome) in handles.iter().zip(outcomes) {
            match outcome {
                Some((_, Some(fatal))) => return Err(fatal),
                Some((result, None)) => {
                    if let Some(stats) = result.stats {
                        mapping.insert(result.descriptor_path, stats);
                    }
                }
                None => {
                    return Err(Error::Compile {
                        config: handle.config_path().to_path_buf(),
                        reason: CompilerFault::Task("compile task panicked".into()).to_string(),
                    });
                }
            }
        }

        Ok(mapping)
    }
}
