//! Configuration context shared by every command
//!
//! Resolves `regkeeper.toml` from `--config`, `REGKEEPER_CONFIG` or the
//! default locations, and turns its setting lines into descriptors under
//! the configured parse policy.

use std::path::Path;

use regkeeper_core::{KeeperConfig, LoadReport, SettingDescriptor, resolve_config_path};
use tracing::warn;

use crate::error::{CliError, Result};

/// A loaded configuration together with its parsed settings.
#[derive(Debug)]
pub struct KeeperContext {
    pub config: KeeperConfig,
    pub report: LoadReport,
}

impl KeeperContext {
    /// Locate, read and validate the configuration and parse its settings.
    ///
    /// Bad setting lines are kept in `report`; see [`Self::settings`] for
    /// the policy applied to them.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit)?;
        let config = KeeperConfig::load(&path)?;
        let report = config.load_settings()?;
        Ok(Self { config, report })
    }

    /// Settings to enforce.
    ///
    /// With `strict_parse` any bad line is an error. Otherwise bad lines are
    /// logged and skipped.
    pub fn settings(&self) -> Result<Vec<SettingDescriptor>> {
        if !self.report.errors.is_empty() {
            if self.config.enforcement.strict_parse {
                let lines: Vec<String> = self.report.errors.iter().map(|e| e.to_string()).collect();
                return Err(CliError::user(format!(
                    "{} setting(s) failed to parse:\n  {}",
                    lines.len(),
                    lines.join("\n  ")
                )));
            }
            for error in &self.report.errors {
                warn!(text = %error.text, "ignoring setting, {}", error);
            }
        }
        Ok(self.report.settings.clone())
    }
}
