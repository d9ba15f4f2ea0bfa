//! `globpack watch`: recompile matched configs on change.

use tokio::signal;

use crate::cli::RunArgs;
use crate::commands::prepare;
use crate::error::Result;
use crate::ui;

/// Execute the watch command.
///
/// Compile failures are reported as they happen and never stop the
/// watchers. Runs until Ctrl+C, then closes every watcher.
///
/// # Errors
///
/// Returns an error when configs cannot be loaded or watched, or when a
/// watcher fails to shut down.
pub async fn execute(args: RunArgs, colors: bool) -> Result<()> {
    let session = prepare(&args, colors)?;
    let silent = session.options().silent;

    let callback = globpack::callback(move |error, stats| {
        let Some(err) = error else {
            return;
        };
        if !silent {
            ui::error(&err.to_string());
            if let Some(stats) = stats {
                for message in stats.all_errors() {
                    eprintln!("{}", message);
                }
            }
        }
    });

    let watchers = session.watch(args.patterns.iter(), Some(callback)).await?;
    if !silent {
        ui::info(&format!(
            "Watching {} config(s). Press Ctrl+C to stop.",
            watchers.len()
        ));
    }

    signal::ctrl_c().await?;

    if !silent {
        ui::info("Closing watchers...");
    }
    session.close_all().await?;
    if !silent {
        ui::success("Stopped watching");
    }
    Ok(())
}
