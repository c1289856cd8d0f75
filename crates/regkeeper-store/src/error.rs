//! Error types for regkeeper-store

/// Result type for regkeeper-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or watching registry keys
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key does not exist under its root
    #[error("Key does not exist: {key}")]
    KeyNotFound { key: String },

    /// The caller lacks the rights to read, write or watch the key
    #[error("Access denied to {key}")]
    AccessDenied { key: String },

    /// The stored value has a registry type that cannot be represented
    #[error("Value {name} under {key} has unsupported registry type {type_code}")]
    UnsupportedValueType {
        key: String,
        name: String,
        type_code: u32,
    },

    /// The native change-notification primitive could not be (re)established
    #[error("Watch on {key} failed: {message}")]
    WatchFailed { key: String, message: String },

    /// No registry backend exists on this platform
    #[error("The Windows registry is not available on this platform")]
    Unsupported,

    #[error("I/O error at {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(key: impl ToString, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }

    pub fn key_not_found(key: impl ToString) -> Self {
        Self::KeyNotFound {
            key: key.to_string(),
        }
    }

    pub fn access_denied(key: impl ToString) -> Self {
        Self::AccessDenied {
            key: key.to_string(),
        }
    }

    /// Whether retrying on a later cycle may succeed without outside help.
    ///
    /// Missing keys and denied access are expected to clear up when an
    /// administrator recreates the key or restores rights.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. } | Self::AccessDenied { .. } | Self::Io { .. }
        )
    }
}
