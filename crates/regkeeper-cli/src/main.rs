//! RegKeeper CLI
//!
//! Keeps registry values pinned to the values listed in `regkeeper.toml`.

mod cli;
mod commands;
mod context;
mod error;
mod logging;
mod startup;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let command = cli.command.unwrap_or(Commands::Run);

    // `run` sets up its own logging from the config file
    if cli.verbose && command != Commands::Run {
        logging::init_stderr("debug")?;
        tracing::debug!("Verbose mode enabled");
    }

    match command {
        Commands::Run => commands::run_daemon(config, cli.verbose),
        Commands::Check { json } => commands::run_check(config, json),
        Commands::Apply { json } => commands::run_apply(config, json),
        Commands::Validate { json } => commands::run_validate(config, json),
    }
}
