//! Enforcement engine
//!
//! The engine owns the settings, one [`KeyWatcher`] per distinct key and
//! the sweep timer. Two kinds of threads drive it: watcher threads calling
//! [`EnforcementEngine::on_changed`] and the sweeper calling
//! [`EnforcementEngine::sweep`]. They meet only through engine state:
//!
//! - one coarse mutex over settings, watchers and per-key guards
//! - one guard mutex per key, held for a whole re-application pass, which
//!   also carries that key's debounce timestamp
//!
//! Watchers are always stopped after the engine mutex has been released, so
//! a watcher thread blocked on engine state can finish before it is joined.

mod apply;
mod report;
mod sweeper;

pub use apply::{ApplyOutcome, PriorValue, apply_setting, apply_settings, check_settings};
pub use report::{
    ApplyFailure, ApplyReport, CheckReport, CheckStatus, Correction, DriftItem, FailureKind,
    SweepReport,
};
pub use sweeper::Sweeper;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use regkeeper_store::{ConfigStore, Error as StoreError, KeyId};
use tracing::{debug, error, info, warn};

use crate::setting::SettingDescriptor;
use crate::watcher::{KeyWatcher, WatchHandler};
use crate::{Error, Result};

/// Default period of the full sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Default window in which repeated change notifications for one key are
/// dropped.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Tuning for an [`EnforcementEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub sweep_interval: Duration,
    pub debounce: Duration,
    /// Replace a failed watcher once a sweep can read its key again
    pub rewatch_recovered_keys: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            rewatch_recovered_keys: false,
        }
    }
}

/// Result of handling one change notification.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// Every member of the key was re-applied
    Restored(ApplyReport),
    /// The key was re-applied within the debounce window; nothing was done
    Debounced,
    /// No watcher is registered for the key
    UnknownKey,
}

/// Keeps registry entries at their desired values.
pub struct EnforcementEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<dyn ConfigStore>,
    options: EngineOptions,
    handler: Arc<dyn WatchHandler>,
    state: Mutex<EngineState>,
    sweeper: Mutex<Option<Sweeper>>,
    /// Entries rewritten since creation
    corrections: AtomicU64,
}

#[derive(Default)]
struct EngineState {
    /// Load order
    settings: Vec<SettingDescriptor>,
    watchers: HashMap<KeyId, Arc<KeyWatcher>>,
    guards: HashMap<KeyId, Arc<Mutex<KeyGuard>>>,
    shut_down: bool,
}

#[derive(Debug, Default)]
struct KeyGuard {
    last_applied_at: Option<Instant>,
}

impl EngineState {
    fn guard(&mut self, key: &KeyId) -> Arc<Mutex<KeyGuard>> {
        Arc::clone(self.guards.entry(key.clone()).or_default())
    }
}

/// Routes watcher notifications back into the engine without keeping it
/// alive.
struct EngineHandler {
    engine: Weak<EngineInner>,
}

impl WatchHandler for EngineHandler {
    fn changed(&self, key: &KeyId) {
        if let Some(engine) = self.engine.upgrade() {
            engine.on_changed(key);
        }
    }

    fn watch_failed(&self, key: &KeyId, cause: &StoreError) {
        if let Some(engine) = self.engine.upgrade() {
            engine.on_watch_failed(key, cause);
        }
    }
}

impl EnforcementEngine {
    pub fn new(store: Arc<dyn ConfigStore>, options: EngineOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<EngineInner>| EngineInner {
            store,
            options,
            handler: Arc::new(EngineHandler {
                engine: weak.clone(),
            }),
            state: Mutex::new(EngineState::default()),
            sweeper: Mutex::new(None),
            corrections: AtomicU64::new(0),
        });
        Self { inner }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Apply each setting in order, then start watching its key.
    ///
    /// Store errors are logged and reported; they never stop the remaining
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn load_and_apply<I>(&self, settings: I) -> Result<ApplyReport>
    where
        I: IntoIterator<Item = SettingDescriptor>,
    {
        let mut report = ApplyReport::default();
        for setting in settings {
            if self.inner.state.lock().shut_down {
                return Err(Error::ShutDown);
            }
            let outcome = apply_setting(self.inner.store.as_ref(), &setting);
            apply::record(&mut report, &setting, outcome);
            self.register_watch(setting)?;
        }
        info!(
            checked = report.checked,
            corrected = report.corrected.len(),
            failed = report.failed.len(),
            watchers = self.watcher_count(),
            "settings loaded"
        );
        self.inner.count_corrections(&report);
        Ok(report)
    }

    /// Track `setting` and route it to the watcher of its key, creating and
    /// starting one if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn register_watch(&self, setting: SettingDescriptor) -> Result<()> {
        self.inner.register_watch(setting)
    }

    /// React to a change of `key`.
    pub fn on_changed(&self, key: &KeyId) -> ChangeOutcome {
        self.inner.on_changed(key)
    }

    /// Record that the watch on `key` is gone. The sweep keeps enforcing it.
    pub fn on_watch_failed(&self, key: &KeyId, cause: &StoreError) {
        self.inner.on_watch_failed(key, cause);
    }

    /// Re-check every setting in load order, regardless of debounce.
    pub fn sweep(&self) -> SweepReport {
        self.inner.sweep()
    }

    /// Compare every setting with the store without writing.
    pub fn check(&self) -> CheckReport {
        let settings = self.settings();
        check_settings(self.inner.store.as_ref(), &settings)
    }

    /// Start the periodic sweep. No-op when already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown) and
    /// [`Error::Io`] if the timer thread cannot be spawned.
    pub fn start_sweeper(&self) -> Result<()> {
        if self.inner.state.lock().shut_down {
            return Err(Error::ShutDown);
        }
        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.as_ref().is_some_and(Sweeper::is_running) {
            return Ok(());
        }

        let engine = Arc::downgrade(&self.inner);
        *sweeper = Some(Sweeper::start(self.inner.options.sweep_interval, move || {
            if let Some(engine) = engine.upgrade() {
                engine.sweep();
            }
        })?);
        Ok(())
    }

    pub fn is_sweeping(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(Sweeper::is_running)
    }

    /// Stop the sweeper and every watcher, then forget all watchers.
    ///
    /// Idempotent. Also run when the engine is dropped.
    pub fn shutdown(&self) {
        let sweeper = self.inner.sweeper.lock().take();
        if let Some(mut sweeper) = sweeper {
            sweeper.stop();
        }

        let watchers: Vec<Arc<KeyWatcher>> = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.watchers.drain().map(|(_, watcher)| watcher).collect()
        };

        let count = watchers.len();
        for watcher in &watchers {
            watcher.stop();
        }
        info!(watchers = count, "enforcement stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().shut_down
    }

    /// Number of distinct watched keys.
    pub fn watcher_count(&self) -> usize {
        self.inner.state.lock().watchers.len()
    }

    pub fn watcher_for(&self, key: &KeyId) -> Option<Arc<KeyWatcher>> {
        self.inner.state.lock().watchers.get(key).cloned()
    }

    /// Number of entries the engine has rewritten since it was created.
    pub fn correction_count(&self) -> u64 {
        self.inner.corrections.load(Ordering::Relaxed)
    }

    /// Every tracked setting, in load order.
    pub fn settings(&self) -> Vec<SettingDescriptor> {
        self.inner.state.lock().settings.clone()
    }
}

impl Drop for EnforcementEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EnforcementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EnforcementEngine")
            .field("options", &self.inner.options)
            .field("settings", &state.settings.len())
            .field("watchers", &state.watchers.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}

impl EngineInner {
    fn count_corrections(&self, report: &ApplyReport) {
        self.corrections
            .fetch_add(report.corrected.len() as u64, Ordering::Relaxed);
    }

    fn register_watch(&self, setting: SettingDescriptor) -> Result<()> {
        let key = setting.key_id();
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(Error::ShutDown);
        }

        if let Some(conflict) = state.settings.iter().find(|existing| {
            existing.key_id() == key
                && existing.name().eq_ignore_ascii_case(setting.name())
                && existing.value() != setting.value()
        }) {
            warn!(
                "{} is pinned to both '{}' and '{}'",
                setting.full_entry_path(),
                conflict.value(),
                setting.value()
            );
        }
        let is_new = !state.settings.contains(&setting);
        if is_new {
            state.settings.push(setting.clone());
        }
        state.guard(&key);

        if let Some(watcher) = state.watchers.get(&key) {
            if is_new {
                watcher.add_member(setting);
            }
            return Ok(());
        }

        let watcher = Arc::new(KeyWatcher::new(
            setting.key().clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.handler),
        ));
        watcher.add_member(setting);
        state.watchers.insert(key, Arc::clone(&watcher));
        drop(state);

        debug!(key = %watcher.path(), "watching key");
        watcher.start();
        Ok(())
    }

    fn on_changed(&self, key: &KeyId) -> ChangeOutcome {
        let (members, guard) = {
            let mut state = self.state.lock();
            if state.shut_down {
                return ChangeOutcome::UnknownKey;
            }
            let Some(watcher) = state.watchers.get(key) else {
                return ChangeOutcome::UnknownKey;
            };
            let members = watcher.members();
            (members, state.guard(key))
        };

        let mut guard = guard.lock();
        if let Some(last) = guard.last_applied_at
            && last.elapsed() < self.options.debounce
        {
            debug!(key = %key, "change notification debounced");
            return ChangeOutcome::Debounced;
        }

        let report = apply_settings(self.store.as_ref(), &members);
        guard.last_applied_at = Some(Instant::now());
        debug!(
            key = %key,
            checked = report.checked,
            corrected = report.corrected.len(),
            "key re-applied"
        );
        self.count_corrections(&report);
        ChangeOutcome::Restored(report)
    }

    fn on_watch_failed(&self, key: &KeyId, cause: &StoreError) {
        error!(
            error = %cause,
            "watch on {} failed; the key is enforced by the periodic sweep only",
            key
        );
    }

    fn sweep(&self) -> SweepReport {
        let (settings, guards) = {
            let mut state = self.state.lock();
            if state.shut_down {
                return SweepReport::default();
            }
            let settings = state.settings.clone();
            let guards: HashMap<KeyId, Arc<Mutex<KeyGuard>>> = settings
                .iter()
                .map(|setting| {
                    let key = setting.key_id();
                    let guard = state.guard(&key);
                    (key, guard)
                })
                .collect();
            (settings, guards)
        };

        let mut report = SweepReport::default();
        let mut failed_keys = HashSet::new();
        for setting in &settings {
            let key = setting.key_id();
            let outcome = match guards.get(&key) {
                Some(guard) => {
                    let _guard = guard.lock();
                    apply_setting(self.store.as_ref(), setting)
                }
                None => apply_setting(self.store.as_ref(), setting),
            };
            if matches!(outcome, ApplyOutcome::Failed(_)) {
                failed_keys.insert(key);
            }
            apply::record(&mut report, setting, outcome);
        }

        debug!(
            checked = report.checked,
            corrected = report.corrected.len(),
            failed = report.failed.len(),
            "sweep finished"
        );

        if self.options.rewatch_recovered_keys {
            self.rewatch(&failed_keys);
        }
        self.count_corrections(&report);
        report
    }

    /// Replace failed watchers whose key was fully readable in the last
    /// sweep.
    fn rewatch(&self, failed_keys: &HashSet<KeyId>) {
        let replaced: Vec<(Arc<KeyWatcher>, Arc<KeyWatcher>)> = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            let recovered: Vec<KeyId> = state
                .watchers
                .iter()
                .filter(|(key, watcher)| watcher.is_failed() && !failed_keys.contains(*key))
                .map(|(key, _)| key.clone())
                .collect();

            recovered
                .into_iter()
                .filter_map(|key| {
                    let old = state.watchers.remove(&key)?;
                    let fresh = Arc::new(KeyWatcher::new(
                        old.path().clone(),
                        Arc::clone(&self.store),
                        Arc::clone(&self.handler),
                    ));
                    for member in old.members() {
                        fresh.add_member(member);
                    }
                    state.watchers.insert(key, Arc::clone(&fresh));
                    Some((old, fresh))
                })
                .collect()
        };

        for (old, fresh) in replaced {
            old.stop();
            info!(key = %fresh.path(), "key is reachable again; watch re-established");
            fresh.start();
        }
    }
}
