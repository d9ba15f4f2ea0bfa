//! Console output policy for orchestrators.
//!
//! Every line the orchestrators print goes through [`OutputController`], which
//! decides whether it is written at all.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use owo_colors::OwoColorize;
use parking_lot::Mutex;

use crate::compiler::ProgressEvent;
use crate::options::GlobpackOptions;
use crate::stats::{Stats, StatsOptions};

pub type Sink = Arc<Mutex<dyn Write + Send>>;

/// Routes progress, summaries and notices to a sink according to the
/// `silent`/`progress` options.
#[derive(Clone)]
pub struct OutputController {
    silent: bool,
    progress: bool,
    stats_options: StatsOptions,
    sink: Sink,
}

impl OutputController {
    pub fn new(options: &GlobpackOptions) -> Self {
        Self::with_sink(options, Arc::new(Mutex::new(io::stdout())))
    }

    pub fn with_sink(options: &GlobpackOptions, sink: Sink) -> Self {
        Self {
            silent: options.silent,
            progress: options.progress,
            stats_options: options.stats,
            sink,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Whether progress events should be forwarded here at all.
    pub fn wants_progress(&self) -> bool {
        !self.silent && self.progress
    }

    /// One indicator line per progress event.
    pub fn progress(&self, event: &ProgressEvent) {
        if !self.wants_progress() {
            return;
        }

        let percent = format!("{:>3}%", (event.percentage * 100.0).round() as u32);
        let label = event
            .config
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| event.config.display().to_string());

        if self.stats_options.colors {
            self.write_line(&format!("{} {} {}", percent.cyan(), label.bold(), event.message));
        } else {
            self.write_line(&format!("{} {} {}", percent, label, event.message));
        }
    }

    /// Summary line for a finished compile. Skipped in progress mode, where
    /// the final indicator already marks completion.
    pub fn summary(&self, stats: &Stats) {
        if self.silent || self.progress {
            return;
        }
        self.write_line(&stats.summary(&self.stats_options));
    }

    pub fn notice(&self, message: &str) {
        if self.silent {
            return;
        }
        self.write_line(message);
    }

    fn write_line(&self, line: &str) {
        let mut sink = self.sink.lock();
        if let Err(err) = writeln!(sink, "{}", line).and_then(|_| sink.flush()) {
            tracing::warn!(%err, "failed to write console output");
        }
    }
}

impl fmt::Debug for OutputController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputController")
            .field("silent", &self.silent)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
