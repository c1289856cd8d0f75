//! Shared test utilities for the RegKeeper workspace.
//!
//! This crate provides fixtures used by several test suites. It is a
//! dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`store`]: [`TestStore`] builder over a pre-populated `MemoryStore`
//! - [`handler`]: [`RecordingHandler`] capturing watcher notifications
//! - [`config`]: [`TestConfig`] writing `regkeeper.toml` into a temp dir
//! - [`wait`]: polling helpers for asynchronous assertions

pub mod config;
pub mod handler;
pub mod store;
pub mod wait;

pub use config::TestConfig;
pub use handler::RecordingHandler;
pub use store::{TestStore, key};
pub use wait::wait_until;
