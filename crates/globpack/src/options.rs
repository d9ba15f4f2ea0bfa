use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stats::StatsOptions;

/// Default coalescing window for watch-mode rebuilds, in milliseconds.
pub const DEFAULT_AGGREGATE_TIMEOUT_MS: u64 = 200;

/// Session options shared by every orchestration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobpackOptions {
    /// Replace the bundler with a simulated compiler.
    pub dry_run: bool,
    /// Make simulated compiles fault. Only meaningful with `dry_run`.
    pub failures: bool,
    /// Keep output in memory instead of writing to disk.
    pub memory_fs: bool,
    /// Escalate warnings to failures.
    pub fail_on: bool,
    /// Suppress all console output.
    pub silent: bool,
    /// Write progress indicators instead of summaries.
    pub progress: bool,
    /// Persist `stats.json` next to each compile's output.
    pub json: bool,
    /// Watch coalescing window in milliseconds.
    pub aggregate_timeout: u64,
    pub stats: StatsOptions,
}

impl Default for GlobpackOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            failures: false,
            memory_fs: false,
            fail_on: false,
            silent: false,
            progress: false,
            json: false,
            aggregate_timeout: DEFAULT_AGGREGATE_TIMEOUT_MS,
            stats: StatsOptions::default(),
        }
    }
}

impl GlobpackOptions {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout)
    }
}
