//! Tests for the EnforcementEngine

use std::time::Duration;

use pretty_assertions::assert_eq;
use regkeeper_core::{
    ChangeOutcome, CheckStatus, EnforcementEngine, EngineOptions, FailureKind, SettingDescriptor,
    WatchState,
};
use regkeeper_store::TypedValue;
use regkeeper_test_utils::{TestStore, key, wait_until};

const PATIENCE: Duration = Duration::from_secs(5);

fn setting(line: &str) -> SettingDescriptor {
    SettingDescriptor::parse(line).unwrap()
}

fn engine_with(store: &TestStore, options: EngineOptions) -> EnforcementEngine {
    EnforcementEngine::new(store.shared(), options)
}

/// Debounce long enough that watcher threads never re-apply on their own
/// once the key has been primed with a first pass.
fn quiet_options() -> EngineOptions {
    EngineOptions {
        debounce: Duration::from_secs(3600),
        ..EngineOptions::default()
    }
}

fn prime(engine: &EnforcementEngine, path: &str) {
    let outcome = engine.on_changed(&key(path).id());
    assert!(matches!(
        outcome,
        ChangeOutcome::Restored(_) | ChangeOutcome::Debounced
    ));
}

#[test]
fn load_writes_only_what_differs() {
    let store = TestStore::new()
        .with_value(r"HKCU\Console", "CursorSize", TypedValue::DWord(25))
        .with_value(r"HKCU\Console", "QuickEdit", TypedValue::DWord(0));
    let writes_before = store.write_count();
    let engine = engine_with(&store, quiet_options());

    let report = engine
        .load_and_apply([
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
            setting(r"HKCU\Console\QuickEdit|DWORD|1"),
        ])
        .unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.corrected.len(), 1);
    assert_eq!(report.corrected[0].previous.as_deref(), Some("0"));
    assert_eq!(store.write_count(), writes_before + 1);
    assert_eq!(
        store.value(r"HKCU\Console", "QuickEdit"),
        Some(TypedValue::DWord(1))
    );
}

#[test]
fn reapplying_converged_settings_writes_nothing() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");
    let writes = store.write_count();

    let report = engine.sweep();
    assert!(report.is_clean());
    assert_eq!(report.checked, 1);
    assert_eq!(store.write_count(), writes);
}

#[test]
fn watcher_count_matches_distinct_keys() {
    let store = TestStore::new()
        .with_key(r"HKCU\Console")
        .with_key(r"HKCU\Console\TrueTypeFont")
        .with_key(r"HKLM\SOFTWARE\Vendor");
    let engine = engine_with(&store, quiet_options());

    engine
        .load_and_apply([
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
            setting(r"hkey_current_user\console\QuickEdit|DWORD|1"),
            setting(r"HKCU\Console\TrueTypeFont\0|REG_SZ|Consolas"),
            setting(r"HKLM\SOFTWARE\Vendor\Banner|REG_SZ|hello"),
            setting(r"HKEY_LOCAL_MACHINE\software\vendor\Level|QWORD|7"),
        ])
        .unwrap();

    assert_eq!(engine.watcher_count(), 3);
    let console = engine.watcher_for(&key(r"HKCU\Console").id()).unwrap();
    assert_eq!(console.members().len(), 2);
    let vendor = engine.watcher_for(&key(r"HKLM\SOFTWARE\Vendor").id()).unwrap();
    assert_eq!(vendor.members().len(), 2);
    assert!(wait_until(PATIENCE, || store.memory().open_watch_count() == 3));
}

#[test]
fn settings_keep_load_order() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    let loaded = vec![
        setting(r"HKCU\Console\B|DWORD|2"),
        setting(r"HKCU\Console\A|DWORD|1"),
        setting(r"HKCU\Console\C|DWORD|3"),
    ];

    engine.load_and_apply(loaded.clone()).unwrap();
    assert_eq!(engine.settings(), loaded);
}

#[test]
fn repeated_notifications_within_window_run_one_pass() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    let console = key(r"HKCU\Console").id();
    assert!(matches!(engine.on_changed(&console), ChangeOutcome::Debounced));
    assert!(matches!(engine.on_changed(&console), ChangeOutcome::Debounced));
    assert_eq!(
        store.value(r"HKCU\Console", "CursorSize"),
        Some(TypedValue::DWord(10))
    );
}

#[test]
fn notification_after_window_reapplies_every_member() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(
        &store,
        EngineOptions {
            debounce: Duration::from_millis(50),
            ..EngineOptions::default()
        },
    );
    engine
        .load_and_apply([
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
            setting(r"HKCU\Console\QuickEdit|DWORD|1"),
        ])
        .unwrap();

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    store.external_write(r"HKCU\Console", "QuickEdit", TypedValue::DWord(0));

    assert!(wait_until(PATIENCE, || {
        if let ChangeOutcome::Restored(_) = engine.on_changed(&key(r"HKCU\Console").id()) {
            return store.value(r"HKCU\Console", "CursorSize") == Some(TypedValue::DWord(25))
                && store.value(r"HKCU\Console", "QuickEdit") == Some(TypedValue::DWord(1));
        }
        false
    }));
}

#[test]
fn unknown_key_notification_is_ignored() {
    let store = TestStore::new();
    let engine = engine_with(&store, quiet_options());
    assert!(matches!(
        engine.on_changed(&key(r"HKCU\Nowhere").id()),
        ChangeOutcome::UnknownKey
    ));
}

#[test]
fn repeated_line_is_registered_once() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    let line = setting(r"HKCU\Console\CursorSize|DWORD|25");

    engine
        .load_and_apply([line.clone(), line.clone()])
        .unwrap();
    engine.load_and_apply([line.clone()]).unwrap();

    assert_eq!(engine.settings(), vec![line.clone()]);
    let console = engine.watcher_for(&key(r"HKCU\Console").id()).unwrap();
    assert_eq!(console.members(), vec![line]);
}

#[test]
fn correction_count_accumulates_across_passes() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");
    assert_eq!(engine.correction_count(), 1);

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    engine.sweep();
    engine.sweep();

    assert_eq!(engine.correction_count(), 2);
}

#[test]
fn sweep_ignores_debounce() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    let report = engine.sweep();

    assert_eq!(report.corrected.len(), 1);
    assert_eq!(report.corrected[0].previous.as_deref(), Some("10"));
    assert_eq!(
        store.value(r"HKCU\Console", "CursorSize"),
        Some(TypedValue::DWord(25))
    );
}

#[test]
fn sweep_failures_do_not_stop_other_settings() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([
            setting(r"HKCU\Missing\Value|DWORD|1"),
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
        ])
        .unwrap();
    prime(&engine, r"HKCU\Console");
    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));

    let report = engine.sweep();
    assert_eq!(report.checked, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::KeyNotFound);
    assert_eq!(report.corrected.len(), 1);
}

#[test]
fn periodic_sweep_converges() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(
        &store,
        EngineOptions {
            sweep_interval: Duration::from_millis(50),
            ..quiet_options()
        },
    );
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");
    engine.start_sweeper().unwrap();
    engine.start_sweeper().unwrap();
    assert!(engine.is_sweeping());

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    assert!(wait_until(PATIENCE, || {
        store.value(r"HKCU\Console", "CursorSize") == Some(TypedValue::DWord(25))
    }));
}

#[test]
fn check_reports_drift_without_writing() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    prime(&engine, r"HKCU\Console");
    assert_eq!(engine.check().status, CheckStatus::Healthy);

    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::String("25".into()));
    let writes = store.write_count();

    let report = engine.check();
    assert_eq!(report.status, CheckStatus::Drifted);
    assert_eq!(report.drifted[0].actual.as_deref(), Some("REG_SZ 25"));
    assert_eq!(store.write_count(), writes);
}

#[test]
fn failed_watch_leaves_key_to_the_sweep() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
        .unwrap();
    let console = key(r"HKCU\Console").id();
    assert!(wait_until(PATIENCE, || store.memory().open_watch_count() == 1));

    store.delete_key(r"HKCU\Console");
    let watcher = engine.watcher_for(&console).unwrap();
    assert!(wait_until(PATIENCE, || watcher.is_failed()));

    let report = engine.sweep();
    assert_eq!(report.failed[0].kind, FailureKind::KeyNotFound);

    store.memory().create_key(&key(r"HKCU\Console"));
    let report = engine.sweep();
    assert!(report.failed.is_empty());
    assert_eq!(report.corrected.len(), 1);

    // Without rewatching the failed watcher stays in place.
    let same = engine.watcher_for(&console).unwrap();
    assert!(same.is_failed());
}

#[test]
fn recovered_key_is_watched_again_when_enabled() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    let engine = engine_with(
        &store,
        EngineOptions {
            rewatch_recovered_keys: true,
            debounce: Duration::from_millis(50),
            ..EngineOptions::default()
        },
    );
    engine
        .load_and_apply([
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
            setting(r"HKCU\Console\QuickEdit|DWORD|1"),
        ])
        .unwrap();
    let console = key(r"HKCU\Console").id();
    assert!(wait_until(PATIENCE, || store.memory().open_watch_count() == 1));

    store.delete_key(r"HKCU\Console");
    let failed = engine.watcher_for(&console).unwrap();
    assert!(wait_until(PATIENCE, || failed.is_failed()));

    // Still missing: the failed watcher is kept.
    engine.sweep();
    assert!(engine.watcher_for(&console).unwrap().is_failed());

    store.memory().create_key(&key(r"HKCU\Console"));
    engine.sweep();

    let fresh = engine.watcher_for(&console).unwrap();
    assert!(!fresh.is_failed());
    assert_eq!(fresh.members().len(), 2);
    assert_eq!(engine.watcher_count(), 1);
    assert!(wait_until(PATIENCE, || fresh.state() == WatchState::Watching
        && store.memory().open_watch_count() == 1));

    // The fresh watcher enforces on change again.
    assert!(wait_until(PATIENCE, || {
        store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
        thread_sleep_ms(100);
        store.value(r"HKCU\Console", "CursorSize") == Some(TypedValue::DWord(25))
    }));
}

fn thread_sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}

#[test]
fn shutdown_releases_every_watch() {
    let store = TestStore::new()
        .with_key(r"HKCU\Console")
        .with_key(r"HKCU\Environment");
    let engine = engine_with(&store, quiet_options());
    engine
        .load_and_apply([
            setting(r"HKCU\Console\CursorSize|DWORD|25"),
            setting(r"HKCU\Environment\EDITOR|REG_SZ|vim"),
        ])
        .unwrap();
    engine.start_sweeper().unwrap();
    assert!(wait_until(PATIENCE, || store.memory().open_watch_count() == 2));

    let watcher = engine.watcher_for(&key(r"HKCU\Console").id()).unwrap();
    engine.shutdown();

    assert_eq!(engine.watcher_count(), 0);
    assert_eq!(watcher.state(), WatchState::Stopped);
    assert!(!watcher.is_failed());
    assert_eq!(store.memory().open_watch_count(), 0);

    let writes = store.write_count();
    store.external_write(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
    thread_sleep_ms(100);
    assert_eq!(store.write_count(), writes + 1);
}

#[test]
fn dropping_the_engine_stops_watching() {
    let store = TestStore::new().with_key(r"HKCU\Console");
    {
        let engine = engine_with(&store, quiet_options());
        engine
            .load_and_apply([setting(r"HKCU\Console\CursorSize|DWORD|25")])
            .unwrap();
        assert!(wait_until(PATIENCE, || store.memory().open_watch_count() == 1));
    }
    assert_eq!(store.memory().open_watch_count(), 0);
}
