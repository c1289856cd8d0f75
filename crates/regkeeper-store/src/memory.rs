//! In-process registry backend
//!
//! `MemoryStore` implements the full [`ConfigStore`] contract, including
//! single-shot watches that coalesce bursts of changes, key deletion and
//! access revocation. It backs the test suites on every platform.
//!
//! A watch is signalled by value changes on its key or on any key below
//! it, as a subtree registry watch is. Deleting or revoking access to a
//! descendant does not signal the ancestor.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::store::{ConfigStore, KeyWatch, WaitOutcome};
use crate::{Error, KeyId, KeyPath, Result, TypedValue};

/// Thread-safe in-memory registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct State {
    keys: HashMap<KeyId, KeyEntry>,
    watches: HashMap<u64, WatchSlot>,
    next_epoch: u64,
    next_watch: u64,
    writes: u64,
}

#[derive(Debug)]
struct KeyEntry {
    path: KeyPath,
    /// Distinguishes a recreated key from the one that was deleted.
    epoch: u64,
    revision: u64,
    denied: bool,
    /// Keyed by upper-cased value name.
    values: BTreeMap<String, TypedValue>,
}

#[derive(Debug)]
struct WatchSlot {
    key: KeyId,
    armed: Option<Mark>,
    closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    epoch: u64,
    revision: u64,
}

impl KeyEntry {
    fn mark(&self) -> Mark {
        Mark {
            epoch: self.epoch,
            revision: self.revision,
        }
    }
}

impl State {
    fn entry(&self, key: &KeyPath) -> Result<&KeyEntry> {
        let entry = self
            .keys
            .get(&key.id())
            .ok_or_else(|| Error::key_not_found(key))?;
        if entry.denied {
            return Err(Error::access_denied(key));
        }
        Ok(entry)
    }

    fn entry_mut(&mut self, key: &KeyPath) -> Result<&mut KeyEntry> {
        let entry = self
            .keys
            .get_mut(&key.id())
            .ok_or_else(|| Error::key_not_found(key))?;
        if entry.denied {
            return Err(Error::access_denied(key));
        }
        Ok(entry)
    }

    /// Record a value change on `key`, visible to watches on the key and
    /// on every existing ancestor.
    fn touch(&mut self, key: &KeyId) {
        for (id, entry) in &mut self.keys {
            if id == key || is_ancestor(id, key) {
                entry.revision += 1;
            }
        }
    }
}

fn is_ancestor(ancestor: &KeyId, key: &KeyId) -> bool {
    if ancestor.root() != key.root() {
        return false;
    }
    if ancestor.as_str().is_empty() {
        return !key.as_str().is_empty();
    }
    key.as_str()
        .strip_prefix(ancestor.as_str())
        .is_some_and(|rest| rest.starts_with('\\'))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `key` if it does not exist yet.
    pub fn create_key(&self, key: &KeyPath) {
        let mut state = self.shared.state.lock();
        if state.keys.contains_key(&key.id()) {
            return;
        }
        state.next_epoch += 1;
        let epoch = state.next_epoch;
        state.keys.insert(
            key.id(),
            KeyEntry {
                path: key.clone(),
                epoch,
                revision: 0,
                denied: false,
                values: BTreeMap::new(),
            },
        );
    }

    /// Delete `key` and every value under it, waking its watchers.
    ///
    /// Returns false if the key did not exist.
    pub fn delete_key(&self, key: &KeyPath) -> bool {
        let removed = self.shared.state.lock().keys.remove(&key.id()).is_some();
        if removed {
            self.shared.changed.notify_all();
        }
        removed
    }

    /// Deny or restore access to `key`.
    ///
    /// Revoking access wakes armed watchers; their next `arm` then fails.
    pub fn set_access_denied(&self, key: &KeyPath, denied: bool) {
        let mut state = self.shared.state.lock();
        if let Some(entry) = state.keys.get_mut(&key.id()) {
            entry.denied = denied;
            entry.revision += 1;
            drop(state);
            self.shared.changed.notify_all();
        }
    }

    pub fn key_exists(&self, key: &KeyPath) -> bool {
        self.shared.state.lock().keys.contains_key(&key.id())
    }

    /// Spelling of the key as it was first created.
    pub fn key_path(&self, key: &KeyId) -> Option<KeyPath> {
        self.shared
            .state
            .lock()
            .keys
            .get(key)
            .map(|entry| entry.path.clone())
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.shared.state.lock().writes
    }

    /// Number of watch handles currently open.
    pub fn open_watch_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .watches
            .values()
            .filter(|slot| !slot.closed)
            .count()
    }

    /// Number of open watch handles waiting for the next change.
    pub fn armed_watch_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .watches
            .values()
            .filter(|slot| !slot.closed && slot.armed.is_some())
            .count()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self, key: &KeyPath, name: &str) -> Result<Option<TypedValue>> {
        let state = self.shared.state.lock();
        let entry = state.entry(key)?;
        Ok(entry.values.get(&name.to_uppercase()).cloned())
    }

    fn write(&self, key: &KeyPath, name: &str, value: &TypedValue) -> Result<()> {
        let mut state = self.shared.state.lock();
        let entry = state.entry_mut(key)?;
        entry.values.insert(name.to_uppercase(), value.clone());
        state.touch(&key.id());
        state.writes += 1;
        drop(state);
        self.shared.changed.notify_all();
        Ok(())
    }

    fn delete_value(&self, key: &KeyPath, name: &str) -> Result<()> {
        let mut state = self.shared.state.lock();
        let entry = state.entry_mut(key)?;
        if entry.values.remove(&name.to_uppercase()).is_some() {
            state.touch(&key.id());
            drop(state);
            self.shared.changed.notify_all();
        }
        Ok(())
    }

    fn open_watch(&self, key: &KeyPath) -> Result<Box<dyn KeyWatch>> {
        let mut state = self.shared.state.lock();
        state.entry(key)?;
        state.next_watch += 1;
        let id = state.next_watch;
        state.watches.insert(
            id,
            WatchSlot {
                key: key.id(),
                armed: None,
                closed: false,
            },
        );
        Ok(Box::new(MemoryWatch {
            shared: Arc::clone(&self.shared),
            id,
            key: key.clone(),
        }))
    }
}

/// Watch handle returned by [`MemoryStore::open_watch`].
#[derive(Debug)]
pub struct MemoryWatch {
    shared: Arc<Shared>,
    id: u64,
    key: KeyPath,
}

impl KeyWatch for MemoryWatch {
    fn arm(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        let mark = state.entry(&self.key)?.mark();
        match state.watches.get_mut(&self.id) {
            Some(slot) if !slot.closed => {
                slot.armed = Some(mark);
                Ok(())
            }
            _ => Err(Error::WatchFailed {
                key: self.key.to_string(),
                message: "handle is closed".into(),
            }),
        }
    }

    fn wait(&self) -> WaitOutcome {
        let mut state = self.shared.state.lock();
        loop {
            let current = {
                let Some(slot) = state.watches.get(&self.id) else {
                    return WaitOutcome::Closed;
                };
                if slot.closed {
                    return WaitOutcome::Closed;
                }
                slot.armed.map(|armed| {
                    let now = state.keys.get(&slot.key).map(KeyEntry::mark);
                    now != Some(armed)
                })
            };

            if current == Some(true) {
                if let Some(slot) = state.watches.get_mut(&self.id) {
                    slot.armed = None;
                }
                return WaitOutcome::Signaled;
            }

            self.shared.changed.wait(&mut state);
        }
    }

    fn close(&self) {
        let mut state = self.shared.state.lock();
        if let Some(slot) = state.watches.get_mut(&self.id)
            && !slot.closed
        {
            slot.closed = true;
            slot.armed = None;
            drop(state);
            self.shared.changed.notify_all();
        }
    }
}

impl Drop for MemoryWatch {
    fn drop(&mut self) {
        self.shared.state.lock().watches.remove(&self.id);
        self.shared.changed.notify_all();
    }
}
