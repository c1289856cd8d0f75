//! Error types for regkeeper-core

use std::path::PathBuf;

use crate::setting::ParseError;

/// Result type for regkeeper-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regkeeper-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A setting line could not be parsed
    #[error("Invalid setting: {0}")]
    Parse(#[from] ParseError),

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration file exists but is not valid TOML for this schema
    #[error("Failed to parse configuration at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration parsed but holds unusable values
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The engine no longer accepts settings
    #[error("Enforcement engine has been shut down")]
    ShutDown,

    // Transparent wrappers for underlying crate errors
    /// Registry error from regkeeper-store
    #[error(transparent)]
    Store(#[from] regkeeper_store::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
