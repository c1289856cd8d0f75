//! Per-key change watching
//!
//! A [`KeyWatcher`] owns one [`KeyWatch`](regkeeper_store::KeyWatch) on one
//! registry key and a dedicated thread blocked in its `wait`. Changes and
//! terminal failures are reported through a [`WatchHandler`].

mod key_watcher;

pub use key_watcher::KeyWatcher;

use regkeeper_store::KeyId;

/// Lifecycle of a [`KeyWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Constructed, not started
    Idle,
    /// Thread running, blocked on the key or about to be
    Watching,
    /// Stop requested, handle being released
    Stopping,
    /// Thread exited; cannot be restarted
    Stopped,
}

impl std::fmt::Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Watching => "watching",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Receiver of watcher notifications.
///
/// Both methods are invoked on the watcher's own thread. Implementations
/// must not call [`KeyWatcher::stop`] on the watcher that is notifying them.
pub trait WatchHandler: Send + Sync {
    /// The key changed. Fired once per detected change, after the watch has
    /// been re-armed.
    fn changed(&self, key: &KeyId);

    /// The watch could not be kept alive. Fired at most once; the watcher is
    /// `Stopped` afterwards.
    fn watch_failed(&self, key: &KeyId, cause: &regkeeper_store::Error);
}
