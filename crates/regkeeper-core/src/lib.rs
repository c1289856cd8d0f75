//! Enforcement core for RegKeeper
//!
//! Keeps a set of registry entries pinned to their desired values:
//!
//! - **Settings**: `ROOT\Key\...\Name|KIND|VALUE` descriptors and their parser
//! - **Watchers**: one [`KeyWatcher`] thread per distinct key, re-armed after
//!   every change
//! - **Engine**: applies settings on load, re-applies a key when its watcher
//!   fires (debounced), and sweeps every setting on a timer as a backstop
//! - **Config**: the `regkeeper.toml` schema and its lookup
//!
//! # Architecture
//!
//! ```text
//!            regkeeper (CLI)
//!                  |
//!            regkeeper-core
//!                  |
//!           regkeeper-store
//!          /               \
//!   MemoryStore      WindowsRegistry
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use regkeeper_core::{EngineOptions, EnforcementEngine, SettingDescriptor};
//! use regkeeper_store::{ConfigStore, MemoryStore, TypedValue};
//!
//! let store = MemoryStore::new();
//! let setting = SettingDescriptor::parse(r"HKCU\Console\CursorSize|DWORD|25").unwrap();
//! store.create_key(setting.key());
//!
//! let engine = EnforcementEngine::new(Arc::new(store.clone()), EngineOptions::default());
//! engine.load_and_apply([setting.clone()]).unwrap();
//!
//! assert_eq!(
//!     store.read(setting.key(), "CursorSize").unwrap(),
//!     Some(TypedValue::DWord(25))
//! );
//! engine.shutdown();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod setting;
pub mod watcher;

pub use config::{EnforcementSection, KeeperConfig, LoggingSection, resolve_config_path};
pub use engine::{
    ApplyFailure, ApplyOutcome, ApplyReport, ChangeOutcome, CheckReport, CheckStatus, Correction,
    DriftItem, EnforcementEngine, EngineOptions, FailureKind, PriorValue, SweepReport, Sweeper,
    apply_setting, apply_settings, check_settings,
};
pub use error::{Error, Result};
pub use setting::{LineError, LoadReport, ParseError, SettingDescriptor, parse_all, parse_lines};
pub use watcher::{KeyWatcher, WatchHandler, WatchState};
