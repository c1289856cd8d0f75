//! Backend-agnostic registry access

use crate::{KeyPath, Result, TypedValue};

/// Read, write and watch access to registry entries.
///
/// Implementations must be usable from many threads at once: watcher
/// threads, the sweep timer and the controlling thread all share one store.
pub trait ConfigStore: Send + Sync {
    /// Read the current value of `name` under `key`.
    ///
    /// Returns `Ok(None)` when the key exists but holds no such value and
    /// `Error::KeyNotFound` when the key itself is absent.
    fn read(&self, key: &KeyPath, name: &str) -> Result<Option<TypedValue>>;

    /// Write `value` to `name` under an existing `key`.
    ///
    /// Never creates the key.
    fn write(&self, key: &KeyPath, name: &str, value: &TypedValue) -> Result<()>;

    /// Remove `name` from `key`. Removing an absent value succeeds.
    fn delete_value(&self, key: &KeyPath, name: &str) -> Result<()>;

    /// Open a change-notification handle on `key`.
    ///
    /// The handle covers the whole subtree: a value change on `key` or on
    /// any key below it signals it.
    fn open_watch(&self, key: &KeyPath) -> Result<Box<dyn KeyWatch>>;
}

/// How a blocking [`KeyWatch::wait`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The armed registration fired. The key changed, or disappeared.
    Signaled,
    /// The handle was closed while waiting.
    Closed,
}

/// A single-shot "notify on next change" subscription to one key.
///
/// Each [`arm`](KeyWatch::arm) registers interest in exactly one change;
/// after [`wait`](KeyWatch::wait) returns `Signaled` the watch must be armed
/// again. Changes that happen between a signal and the next `arm` are
/// reported by that `arm`'s wait only if the backend coalesces them, so
/// callers should re-arm as early as possible.
pub trait KeyWatch: Send + Sync {
    /// Register for the next change.
    ///
    /// Fails with `KeyNotFound` if the key was deleted and `AccessDenied` if
    /// rights were revoked.
    fn arm(&self) -> Result<()>;

    /// Block until the armed registration fires or the handle is closed.
    fn wait(&self) -> WaitOutcome;

    /// Release the native resource.
    ///
    /// May be called from any thread; a concurrent `wait` returns `Closed`.
    /// Closing twice is a no-op.
    fn close(&self);
}
