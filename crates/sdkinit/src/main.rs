//! sdkinit - copy protocol definitions to a shared volume, then run a command.

mod app;
mod cli;
mod conf;

use std::process::ExitCode;

use clap::Parser;
use sdkinit_log::init_logging;
use tracing::error;

fn main() -> ExitCode {
    let spec_init_config = cli::Cli::parse().into_config();

    if let Err(err) = init_logging(&spec_init_config.spec_log_options) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match app::run(&spec_init_config) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
