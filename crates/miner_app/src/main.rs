mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod render;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::cli::Cli;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    logging::initialize(logging::destination(config.log_to_file), cli.verbose);

    let outcome = app::run(cli.goal(), config)?;
    Ok(outcome.exit_code())
}
