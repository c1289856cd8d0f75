//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the configured level. With a log directory, events
//! go to a daily rolling file through a non-blocking writer; the returned
//! guard must be held until exit so buffered lines are flushed.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::{CliError, Result};

const LOG_FILE_PREFIX: &str = "regkeeper";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr only.
pub fn init_stderr(default_level: &str) -> Result<()> {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(filter(default_level));
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| CliError::user(format!("Failed to set up logging: {}", e)))
}

/// Log to `regkeeper.<date>.log` files in `directory`, keeping
/// `archive_days` files.
pub fn init_rolling(default_level: &str, directory: &Path, archive_days: usize) -> Result<WorkerGuard> {
    fs::create_dir_all(directory)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(archive_days)
        .build(directory)
        .map_err(|e| {
            CliError::user(format!(
                "Failed to open log directory {}: {}",
                directory.display(),
                e
            ))
        })?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter(default_level));
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| CliError::user(format!("Failed to set up logging: {}", e)))?;

    Ok(guard)
}
