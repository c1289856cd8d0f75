//! [`TestConfig`] for config-file and CLI tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory holding a `regkeeper.toml`.
pub struct TestConfig {
    temp_dir: TempDir,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfig {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestConfig::new: failed to create temp dir"),
        }
    }

    /// Create a directory with `regkeeper.toml` holding `content`.
    pub fn with_content(content: &str) -> Self {
        let config = Self::new();
        config.write_file("regkeeper.toml", content);
        config
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of `regkeeper.toml`, whether or not it exists.
    pub fn path(&self) -> PathBuf {
        self.root().join("regkeeper.toml")
    }

    /// Write a file relative to the root and return its path.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestConfig::write_file: failed to create dirs");
        }
        fs::write(&path, content).expect("TestConfig::write_file: failed to write");
        path
    }
}
