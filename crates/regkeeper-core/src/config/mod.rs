//! Process configuration
//!
//! RegKeeper reads one TOML file:
//!
//! ```toml
//! settings = ['HKCU\Console\CursorSize|DWORD|25']
//! settings_file = "settings.txt"   # optional, one setting per line
//!
//! [logging]
//! level = "info"
//! directory = "logs"
//! archive_days = 30
//!
//! [enforcement]
//! sweep_interval_secs = 10
//! debounce_ms = 2000
//! strict_parse = false
//! rewatch_recovered_keys = false
//! auto_start = true
//! ```
//!
//! Top-level keys must come before the first `[section]` header.
//!
//! The file is located by [`resolve_config_path`]: an explicit path wins,
//! then `regkeeper.toml` next to the executable, in the working directory,
//! and finally in the platform config directory.

mod keeper;
mod resolver;

pub use keeper::{EnforcementSection, KeeperConfig, LoggingSection};
pub use resolver::{CONFIG_FILE_NAME, candidate_paths, resolve_config_path};
