//! [`RecordingHandler`] for watcher tests.

use std::time::Duration;

use parking_lot::Mutex;
use regkeeper_core::WatchHandler;
use regkeeper_store::{Error as StoreError, KeyId};

use crate::wait::wait_until;

type Reaction = Box<dyn Fn(usize) + Send + Sync>;

/// Records every notification a watcher delivers.
#[derive(Default)]
pub struct RecordingHandler {
    changed: Mutex<Vec<KeyId>>,
    failed: Mutex<Vec<(KeyId, String)>>,
    reaction: Option<Reaction>,
}

impl std::fmt::Debug for RecordingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHandler")
            .field("changed", &self.changed_count())
            .field("failed", &self.failure_count())
            .finish()
    }
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also run `reaction` inside every `changed` callback, after recording
    /// it. The argument is the 1-based number of that notification.
    pub fn with_reaction(reaction: impl Fn(usize) + Send + Sync + 'static) -> Self {
        Self {
            reaction: Some(Box::new(reaction)),
            ..Self::default()
        }
    }

    pub fn changed_count(&self) -> usize {
        self.changed.lock().len()
    }

    pub fn changed_keys(&self) -> Vec<KeyId> {
        self.changed.lock().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.lock().len()
    }

    /// Failure notifications with the rendered cause.
    pub fn failures(&self) -> Vec<(KeyId, String)> {
        self.failed.lock().clone()
    }

    /// Wait until at least `count` change notifications arrived.
    pub fn wait_for_changes(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.changed_count() >= count)
    }

    /// Wait until at least one failure notification arrived.
    pub fn wait_for_failure(&self, timeout: Duration) -> bool {
        wait_until(timeout, || self.failure_count() > 0)
    }
}

impl WatchHandler for RecordingHandler {
    fn changed(&self, key: &KeyId) {
        let count = {
            let mut changed = self.changed.lock();
            changed.push(key.clone());
            changed.len()
        };
        if let Some(reaction) = &self.reaction {
            reaction(count);
        }
    }

    fn watch_failed(&self, key: &KeyId, cause: &StoreError) {
        self.failed.lock().push((key.clone(), cause.to_string()));
    }
}
