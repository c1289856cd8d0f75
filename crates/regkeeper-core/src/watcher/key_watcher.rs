//! KeyWatcher implementation

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use regkeeper_store::{ConfigStore, Error as StoreError, KeyId, KeyPath, KeyWatch, WaitOutcome};
use tracing::{debug, trace};

use super::{WatchHandler, WatchState};
use crate::setting::SettingDescriptor;

/// Watches one registry key on a dedicated thread.
///
/// The watcher re-arms its single-shot watch before every `changed`
/// notification, so a change made while the handler runs (including a
/// corrective write by the handler itself) is seen by the next wait.
///
/// Closing the native handle is the only way to interrupt a pending wait;
/// [`stop`](Self::stop) does exactly that and then joins the thread. Once
/// `stop` has returned no further notification is delivered.
pub struct KeyWatcher {
    shared: Arc<Shared>,
}

struct Shared {
    key: KeyId,
    path: KeyPath,
    store: Arc<dyn ConfigStore>,
    handler: Arc<dyn WatchHandler>,
    members: RwLock<Vec<SettingDescriptor>>,
    control: Mutex<Control>,
}

struct Control {
    state: WatchState,
    handle: Option<Arc<dyn KeyWatch>>,
    thread: Option<JoinHandle<()>>,
    failed: bool,
}

impl KeyWatcher {
    pub fn new(path: KeyPath, store: Arc<dyn ConfigStore>, handler: Arc<dyn WatchHandler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                key: path.id(),
                path,
                store,
                handler,
                members: RwLock::new(Vec::new()),
                control: Mutex::new(Control {
                    state: WatchState::Idle,
                    handle: None,
                    thread: None,
                    failed: false,
                }),
            }),
        }
    }

    pub fn key(&self) -> &KeyId {
        &self.shared.key
    }

    pub fn path(&self) -> &KeyPath {
        &self.shared.path
    }

    pub fn state(&self) -> WatchState {
        self.shared.control.lock().state
    }

    /// True once the watcher has stopped because of a failure rather than
    /// a requested stop.
    pub fn is_failed(&self) -> bool {
        self.shared.control.lock().failed
    }

    /// Add a setting that lives under this key. Valid in any state.
    pub fn add_member(&self, setting: SettingDescriptor) {
        self.shared.members.write().push(setting);
    }

    /// Snapshot of the settings under this key, in registration order.
    pub fn members(&self) -> Vec<SettingDescriptor> {
        self.shared.members.read().clone()
    }

    /// Begin watching on a new thread. No-op unless `Idle`.
    pub fn start(&self) {
        let mut control = self.shared.control.lock();
        if control.state != WatchState::Idle {
            return;
        }
        control.state = WatchState::Watching;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("watch {}", self.shared.path))
            .spawn(move || run(shared));

        match spawned {
            Ok(thread) => control.thread = Some(thread),
            Err(err) => {
                control.state = WatchState::Stopped;
                control.failed = true;
                drop(control);
                let cause = StoreError::WatchFailed {
                    key: self.shared.path.to_string(),
                    message: format!("could not spawn watch thread: {}", err),
                };
                self.shared.handler.watch_failed(&self.shared.key, &cause);
            }
        }
    }

    /// Stop watching and wait for the thread to exit. Idempotent.
    ///
    /// Called from the watcher's own thread this returns without joining.
    pub fn stop(&self) {
        let thread = {
            let mut control = self.shared.control.lock();
            match control.state {
                WatchState::Idle => control.state = WatchState::Stopped,
                WatchState::Watching => control.state = WatchState::Stopping,
                WatchState::Stopping | WatchState::Stopped => {}
            }
            if let Some(handle) = control.handle.take() {
                handle.close();
            }
            control.thread.take()
        };

        let Some(thread) = thread else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            debug!(key = %self.shared.path, "watch thread panicked during shutdown");
        }

        let mut control = self.shared.control.lock();
        if control.state == WatchState::Stopping {
            control.state = WatchState::Stopped;
        }
    }
}

impl Drop for KeyWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for KeyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyWatcher")
            .field("key", &self.shared.path.to_string())
            .field("state", &self.state())
            .field("members", &self.shared.members.read().len())
            .finish()
    }
}

impl Shared {
    fn stop_requested(&self) -> bool {
        self.control.lock().state != WatchState::Watching
    }

    fn closed_unexpectedly(&self) -> StoreError {
        StoreError::WatchFailed {
            key: self.path.to_string(),
            message: "handle closed unexpectedly".to_string(),
        }
    }
}

fn run(shared: Arc<Shared>) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| watch_loop(&shared)));
    let failure = match result {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(payload) => Some(StoreError::WatchFailed {
            key: shared.path.to_string(),
            message: format!("watch thread panicked: {}", panic_message(payload.as_ref())),
        }),
    };
    finish(&shared, failure);
}

fn watch_loop(shared: &Shared) -> Result<(), StoreError> {
    let handle: Arc<dyn KeyWatch> = Arc::from(shared.store.open_watch(&shared.path)?);
    {
        let mut control = shared.control.lock();
        if control.state != WatchState::Watching {
            handle.close();
            return Ok(());
        }
        control.handle = Some(Arc::clone(&handle));
    }

    handle.arm()?;
    trace!(key = %shared.path, "watch armed");

    loop {
        let outcome = handle.wait();
        if shared.stop_requested() {
            return Ok(());
        }
        match outcome {
            WaitOutcome::Closed => return Err(shared.closed_unexpectedly()),
            WaitOutcome::Signaled => {
                handle.arm()?;
                trace!(key = %shared.path, "change detected");
                shared.handler.changed(&shared.key);
            }
        }
    }
}

fn finish(shared: &Shared, failure: Option<StoreError>) {
    let notify = {
        let mut control = shared.control.lock();
        if let Some(handle) = control.handle.take() {
            handle.close();
        }
        if control.state == WatchState::Watching {
            control.state = WatchState::Stopped;
            control.failed = true;
            Some(failure.unwrap_or_else(|| shared.closed_unexpectedly()))
        } else {
            // A stop from inside the handler leaves no joiner behind.
            if control.state == WatchState::Stopping {
                control.state = WatchState::Stopped;
            }
            None
        }
    };

    match notify {
        Some(cause) => {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                shared.handler.watch_failed(&shared.key, &cause)
            }));
            if delivered.is_err() {
                debug!(key = %shared.path, "watch failure handler panicked");
            }
        }
        None => trace!(key = %shared.path, "watch stopped"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
