//! The `regkeeper.toml` schema

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineOptions;
use crate::setting::{LoadReport, parse_all, parse_lines};
use crate::{Error, Result};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

fn default_level() -> String {
    "info".to_string()
}

fn default_archive_days() -> usize {
    30
}

fn default_sweep_interval_secs() -> u64 {
    10
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default verbosity; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily log files. Logs go to stderr when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Number of daily files kept
    #[serde(default = "default_archive_days")]
    pub archive_days: usize,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            archive_days: default_archive_days(),
        }
    }
}

/// `[enforcement]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementSection {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Refuse to start when any setting line fails to parse
    #[serde(default)]
    pub strict_parse: bool,

    #[serde(default)]
    pub rewatch_recovered_keys: bool,

    /// Register RegKeeper to start at logon
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            debounce_ms: default_debounce_ms(),
            strict_parse: false,
            rewatch_recovered_keys: false,
            auto_start: true,
        }
    }
}

/// Parsed `regkeeper.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Setting lines, `ROOT\Key\Name|KIND|VALUE`
    #[serde(default)]
    pub settings: Vec<String>,

    /// Extra file with one setting per line, relative to the config file
    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub enforcement: EnforcementSection,

    /// File this configuration was loaded from
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl KeeperConfig {
    /// Parse TOML content that did not come from a file.
    ///
    /// Relative paths are resolved against the working directory.
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_at(content, Path::new("<inline>"))
    }

    fn parse_at(content: &str, path: &Path) -> Result<Self> {
        let config: KeeperConfig =
            toml::from_str(content).map_err(|err| Error::ConfigParse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigNotFound`] if `path` is not a file,
    /// [`Error::ConfigParse`] for malformed TOML and
    /// [`Error::InvalidConfig`] for out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse_at(&content, path)?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(?path, "configuration loaded");
        Ok(config)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Check values that TOML types alone cannot constrain.
    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "logging.level '{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.logging.archive_days == 0 {
            return Err(Error::InvalidConfig {
                message: "logging.archive_days must be at least 1".to_string(),
            });
        }
        if self.enforcement.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig {
                message: "enforcement.sweep_interval_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            sweep_interval: Duration::from_secs(self.enforcement.sweep_interval_secs),
            debounce: Duration::from_millis(self.enforcement.debounce_ms),
            rewatch_recovered_keys: self.enforcement.rewatch_recovered_keys,
        }
    }

    /// Resolve a path from the file against the config file's directory.
    pub fn resolve_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Log directory, resolved against the config file's directory.
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.logging
            .directory
            .as_deref()
            .map(|dir| self.resolve_relative(dir))
    }

    /// Parse the inline settings followed by the settings file, if any.
    ///
    /// Bad lines are collected in the report; only failing to read the
    /// settings file is an error.
    pub fn load_settings(&self) -> Result<LoadReport> {
        let mut report = parse_all(&self.settings);

        if let Some(file) = &self.settings_file {
            let path = self.resolve_relative(file);
            if !path.is_file() {
                return Err(Error::ConfigNotFound { path });
            }
            let content = fs::read_to_string(&path)?;
            let from_file = parse_lines(&content);
            report.settings.extend(from_file.settings);
            report.errors.extend(from_file.errors);
        }

        Ok(report)
    }

    /// Every effective value, for the startup banner.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let source = self
            .source
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), |path| path.display().to_string());
        let directory = self
            .log_directory()
            .map_or_else(|| "<stderr>".to_string(), |dir| dir.display().to_string());
        let settings_file = self
            .settings_file
            .as_deref()
            .map_or_else(|| "<none>".to_string(), |file| {
                self.resolve_relative(file).display().to_string()
            });

        vec![
            ("config", source),
            ("logging.level", self.logging.level.clone()),
            ("logging.directory", directory),
            ("logging.archive_days", self.logging.archive_days.to_string()),
            (
                "enforcement.sweep_interval_secs",
                self.enforcement.sweep_interval_secs.to_string(),
            ),
            ("enforcement.debounce_ms", self.enforcement.debounce_ms.to_string()),
            ("enforcement.strict_parse", self.enforcement.strict_parse.to_string()),
            (
                "enforcement.rewatch_recovered_keys",
                self.enforcement.rewatch_recovered_keys.to_string(),
            ),
            ("enforcement.auto_start", self.enforcement.auto_start.to_string()),
            ("settings", self.settings.len().to_string()),
            ("settings_file", settings_file),
        ]
    }
}
