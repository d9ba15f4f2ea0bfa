//! globpack - build or watch many bundler configs at once.

use clap::Parser;
use globpack_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let silent = match &args.command {
        cli::Command::Build(run) | cli::Command::Watch(run) => run.silent,
    };
    logger::init_logger(args.verbose, args.quiet || silent, args.no_color);
    let colors = ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(run) => commands::build_execute(run, colors).await,
        cli::Command::Watch(run) => commands::watch_execute(run, colors).await,
    };

    result.map_err(error::cli_error_to_miette)
}
