//! Command implementations for regkeeper-cli

pub mod apply;
pub mod check;
pub mod run;
pub mod validate;

pub use apply::run_apply;
pub use check::run_check;
pub use run::run_daemon;
pub use validate::run_validate;
