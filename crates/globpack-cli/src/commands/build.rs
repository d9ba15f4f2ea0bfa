//! `globpack build`: compile every matched config once.

use std::time::Instant;

use crate::cli::RunArgs;
use crate::commands::prepare;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// # Errors
///
/// Returns the first config that failed to load or compile. Every config is
/// still compiled before that happens.
pub async fn execute(args: RunArgs, colors: bool) -> Result<()> {
    let start = Instant::now();
    let session = prepare(&args, colors)?;
    let silent = session.options().silent;

    let callback = globpack::callback(|error, stats| {
        if let (Some(err), None) = (error, stats) {
            tracing::debug!(%err, "compiler faulted");
        }
    });

    let results = session.run(args.patterns.iter(), Some(callback)).await?;

    if !silent {
        if results.is_empty() {
            ui::info("No configs matched");
        } else {
            ui::success(&format!(
                "Compiled {} config(s) in {}ms",
                results.len(),
                start.elapsed().as_millis()
            ));
        }
    }
    Ok(())
}
