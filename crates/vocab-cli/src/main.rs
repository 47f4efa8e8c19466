//! Vocabulary command line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use vocab_cli::cli::Cli;
use vocab_cli::commands::run;
use vocab_cli::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    tracing::debug!(store = %cli.store.display(), "using vocabulary store");
    let mut out = io::stdout().lock();
    match run(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
