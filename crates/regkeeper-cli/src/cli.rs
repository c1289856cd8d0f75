//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// RegKeeper - Keep registry values pinned to the values you chose
#[derive(Parser, Debug)]
#[command(name = "regkeeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to regkeeper.toml
    #[arg(short, long, global = true, env = "REGKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run; `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Enforce the configured settings until interrupted
    ///
    /// Applies every setting, watches each key for changes and sweeps all
    /// settings periodically. Stop with Ctrl+C.
    Run,

    /// Report entries that differ from their desired values, without writing
    Check {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Apply every setting once and exit
    Apply {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Parse the configuration and every setting line
    Validate {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
