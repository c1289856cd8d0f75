//! `regkeeper run`: the enforcement daemon

use std::env;
use std::path::Path;
use std::sync::Arc;

use regkeeper_core::{ApplyReport, EnforcementEngine, EngineOptions, KeeperConfig, SettingDescriptor};
use regkeeper_store::{ConfigStore, platform_store};
use tracing::{debug, error, info, warn};

use crate::context::KeeperContext;
use crate::error::Result;
use crate::logging;
use crate::startup::{Registration, launch_command, sync_registration};

/// Load the configuration, set up logging and enforce until Ctrl+C.
pub fn run_daemon(config: Option<&Path>, verbose: bool) -> Result<()> {
    let context = KeeperContext::load(config)?;
    let level = if verbose {
        "debug".to_string()
    } else {
        context.config.logging.level.clone()
    };
    let _guard = match context.config.log_directory() {
        Some(dir) => Some(logging::init_rolling(
            &level,
            &dir,
            context.config.logging.archive_days,
        )?),
        None => {
            logging::init_stderr(&level)?;
            None
        }
    };

    info!("RegKeeper {} starting", env!("CARGO_PKG_VERSION"));
    for (key, value) in context.config.summary() {
        info!("{} = {}", key, value);
    }

    let settings = context.settings()?;
    let store = platform_store()?;
    match env::current_exe() {
        Ok(exe) => register_startup(store.as_ref(), &context.config, &exe),
        Err(err) => warn!("Could not locate the executable for start-at-logon: {}", err),
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    enforce_until(store, context.config.engine_options(), settings, || {
        runtime.block_on(wait_for_ctrl_c())
    })?;

    info!("RegKeeper stopped");
    Ok(())
}

/// Run an engine over `settings` until `wait` returns, then shut it down.
///
/// Returns the report of the initial pass.
pub fn enforce_until(
    store: Arc<dyn ConfigStore>,
    options: EngineOptions,
    settings: Vec<SettingDescriptor>,
    wait: impl FnOnce(),
) -> Result<ApplyReport> {
    let engine = EnforcementEngine::new(store, options);
    let report = engine.load_and_apply(settings)?;
    info!(
        checked = report.checked,
        corrected = report.corrected.len(),
        failed = report.failed.len(),
        "initial pass complete"
    );

    engine.start_sweeper()?;
    info!(keys = engine.watcher_count(), "enforcing, press Ctrl+C to stop");

    wait();

    info!("shutting down");
    engine.shutdown();
    Ok(report)
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
}

/// Bring the start-at-logon value in line with `enforcement.auto_start`.
///
/// Failure is logged and otherwise ignored.
fn register_startup(store: &dyn ConfigStore, config: &KeeperConfig, exe: &Path) {
    let config_path = config
        .source()
        .map(|path| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
    let command = launch_command(exe, config_path.as_deref());

    match sync_registration(store, config.enforcement.auto_start, &command) {
        Ok(Registration::Registered) => info!(%command, "registered to start at logon"),
        Ok(Registration::Removed) => info!("start-at-logon registration removed"),
        Ok(Registration::Unchanged) => debug!("start-at-logon registration unchanged"),
        Err(err) => warn!("Could not update start-at-logon registration: {}", err),
    }
}
