//! `kure`: curate a private CKAN repository from a local workspace of netkan
//! files.

mod cli;
mod console;
mod error;
mod prompt;

use crate::cli::Cli;
use crate::console::Console;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let console = Console::new(!cli.no_color, cli.verbose);
    match cli::run(cli.command, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(&err);
            ExitCode::FAILURE
        },
    }
}
