//! End-to-end enforcement scenarios
//!
//! Each test drives a real engine, with its watcher threads and sweeps,
//! against the in-memory registry while another "process" edits values.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use regkeeper_core::{
    EnforcementEngine, EngineOptions, FailureKind, KeyWatcher, SettingDescriptor, WatchHandler,
    WatchState,
};
use regkeeper_store::{ConfigStore, RegRoot, TypedValue, ValueKind};
use regkeeper_test_utils::{RecordingHandler, TestStore, key, wait_until};

const PATIENCE: Duration = Duration::from_secs(5);
const CONSOLE: &str = r"HKCU\Console";

fn setting(line: &str) -> SettingDescriptor {
    SettingDescriptor::parse(line).unwrap()
}

fn cursor_size(store: &TestStore) -> Option<TypedValue> {
    store.value(CONSOLE, "CursorSize")
}

/// Start an engine over the given settings and wait until every watcher
/// has armed its notification.
fn start_engine(store: &TestStore, options: EngineOptions, lines: &[&str]) -> EnforcementEngine {
    let engine = EnforcementEngine::new(store.shared(), options);
    engine
        .load_and_apply(lines.iter().map(|line| setting(line)))
        .unwrap();
    let watchers = engine.watcher_count();
    assert!(wait_until(PATIENCE, || {
        store.memory().armed_watch_count() >= watchers
    }));
    engine
}

#[test]
fn descriptor_text_parses_into_its_parts() {
    let parsed = setting(r"HKCU\Console\CursorSize|DWORD|25");

    assert_eq!(parsed.root(), RegRoot::CurrentUser);
    assert_eq!(parsed.key_path(), ["Console".to_string()]);
    assert_eq!(parsed.name(), "CursorSize");
    assert_eq!(parsed.kind(), ValueKind::DWord);
    assert_eq!(parsed.value(), &TypedValue::DWord(25));
}

#[test]
fn settings_under_one_key_share_a_watcher() {
    let store = TestStore::new()
        .with_value(CONSOLE, "CursorSize", TypedValue::DWord(25))
        .with_value(CONSOLE, "QuickEdit", TypedValue::DWord(1));
    let engine = start_engine(
        &store,
        EngineOptions::default(),
        &[
            r"HKCU\Console\CursorSize|DWORD|25",
            r"HKEY_CURRENT_USER\Console\QuickEdit|DWORD|1",
        ],
    );

    assert_eq!(engine.watcher_count(), 1);
    let watcher = engine.watcher_for(&key(CONSOLE).id()).unwrap();
    assert_eq!(watcher.members().len(), 2);

    store
        .memory()
        .delete_value(&key(CONSOLE), "QuickEdit")
        .unwrap();
    assert!(wait_until(PATIENCE, || {
        store.value(CONSOLE, "QuickEdit") == Some(TypedValue::DWord(1))
    }));
    assert_eq!(watcher.state(), WatchState::Watching);
    assert!(Arc::ptr_eq(
        &watcher,
        &engine.watcher_for(&key(CONSOLE).id()).unwrap()
    ));
}

#[test]
fn external_change_is_reverted_by_the_watcher() {
    let store = TestStore::new().with_value(CONSOLE, "CursorSize", TypedValue::DWord(25));
    let engine = start_engine(
        &store,
        EngineOptions::default(),
        &[r"HKCU\Console\CursorSize|DWORD|25"],
    );
    assert!(!engine.is_sweeping());
    let writes = store.write_count();

    store.external_write(CONSOLE, "CursorSize", TypedValue::DWord(10));
    assert!(wait_until(Duration::from_secs(12), || {
        cursor_size(&store) == Some(TypedValue::DWord(25))
    }));

    // The engine's own write notifies the watcher too; it must not cause
    // another correction.
    thread::sleep(Duration::from_millis(300));
    assert_eq!(store.write_count(), writes + 2);
    assert_eq!(engine.correction_count(), 1);
    engine.shutdown();
}

#[test]
fn burst_of_changes_runs_one_pass() {
    let store = TestStore::new().with_value(CONSOLE, "CursorSize", TypedValue::DWord(25));
    let engine = start_engine(
        &store,
        EngineOptions::default(),
        &[r"HKCU\Console\CursorSize|DWORD|25"],
    );
    let writes = store.write_count();

    store.external_write(CONSOLE, "CursorSize", TypedValue::DWord(10));
    assert!(wait_until(PATIENCE, || {
        cursor_size(&store) == Some(TypedValue::DWord(25))
    }));
    thread::sleep(Duration::from_millis(500));
    store.external_write(CONSOLE, "CursorSize", TypedValue::DWord(7));

    // Inside the debounce window the second change is left alone
    thread::sleep(Duration::from_millis(500));
    assert_eq!(cursor_size(&store), Some(TypedValue::DWord(7)));
    assert_eq!(store.write_count(), writes + 3);

    // The sweep ignores the window and restores the configured value
    let report = engine.sweep();
    assert_eq!(report.corrected.len(), 1);
    assert_eq!(report.corrected[0].previous.as_deref(), Some("7"));
    assert_eq!(cursor_size(&store), Some(TypedValue::DWord(25)));
    engine.shutdown();
}

#[test]
fn deleted_key_fails_the_watch_once() {
    let store = TestStore::new().with_key(CONSOLE);
    let handler = Arc::new(RecordingHandler::new());
    let watcher = KeyWatcher::new(
        key(CONSOLE),
        store.shared(),
        Arc::clone(&handler) as Arc<dyn WatchHandler>,
    );
    watcher.start();
    assert!(wait_until(PATIENCE, || store.memory().armed_watch_count() == 1));

    assert!(store.delete_key(CONSOLE));
    assert!(handler.wait_for_failure(PATIENCE));
    thread::sleep(Duration::from_millis(200));

    assert_eq!(handler.failure_count(), 1);
    assert_eq!(watcher.state(), WatchState::Stopped);
}

#[test]
fn sweeps_fail_until_the_deleted_key_returns() {
    let store = TestStore::new().with_value(CONSOLE, "CursorSize", TypedValue::DWord(25));
    let engine = start_engine(
        &store,
        EngineOptions::default(),
        &[r"HKCU\Console\CursorSize|DWORD|25"],
    );
    let watcher = engine.watcher_for(&key(CONSOLE).id()).unwrap();

    assert!(store.delete_key(CONSOLE));
    assert!(wait_until(PATIENCE, || watcher.is_failed()));

    for _ in 0..2 {
        let report = engine.sweep();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].kind, FailureKind::KeyNotFound);
    }

    store.memory().create_key(&key(CONSOLE));
    let report = engine.sweep();
    assert!(report.failed.is_empty());
    assert_eq!(report.corrected.len(), 1);
    assert_eq!(cursor_size(&store), Some(TypedValue::DWord(25)));
    engine.shutdown();
}
