//! [`TestStore`] builder for registry test scenarios.

use std::sync::Arc;

use regkeeper_store::{ConfigStore, KeyPath, MemoryStore, RegRoot, TypedValue};

/// Build a [`KeyPath`] from its text form, `HKCU\Console\TrueTypeFont`.
///
/// Panics on an unknown root or a path without a key segment.
pub fn key(path: &str) -> KeyPath {
    let mut parts = path.split('\\');
    let root = parts.next().unwrap_or_default();
    let root = RegRoot::from_alias(root)
        .unwrap_or_else(|| panic!("key: unknown registry root in {:?}", path));
    let segments: Vec<&str> = parts.collect();
    assert!(!segments.is_empty(), "key: {:?} has no key segment", path);
    KeyPath::new(root, segments)
}

/// A [`MemoryStore`] set up with keys and values.
///
/// # Example
///
/// ```rust
/// use regkeeper_store::TypedValue;
/// use regkeeper_test_utils::TestStore;
///
/// let store = TestStore::new()
///     .with_key(r"HKCU\Console")
///     .with_value(r"HKCU\Console", "CursorSize", TypedValue::DWord(10));
/// assert_eq!(store.value(r"HKCU\Console", "CursorSize"), Some(TypedValue::DWord(10)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestStore {
    store: MemoryStore,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key.
    pub fn with_key(self, path: &str) -> Self {
        self.store.create_key(&key(path));
        self
    }

    /// Create the key if needed and store a value under it.
    pub fn with_value(self, path: &str, name: &str, value: TypedValue) -> Self {
        let key = key(path);
        self.store.create_key(&key);
        self.store
            .write(&key, name, &value)
            .expect("TestStore::with_value: write failed");
        self
    }

    /// The underlying store, for direct manipulation.
    pub fn memory(&self) -> &MemoryStore {
        &self.store
    }

    /// A shared handle to hand to an engine or watcher.
    pub fn shared(&self) -> Arc<dyn ConfigStore> {
        Arc::new(self.store.clone())
    }

    /// Simulate another process writing a value.
    pub fn external_write(&self, path: &str, name: &str, value: TypedValue) {
        self.store
            .write(&key(path), name, &value)
            .expect("TestStore::external_write: write failed");
    }

    /// Current value, or `None` if the value or the key is missing.
    pub fn value(&self, path: &str, name: &str) -> Option<TypedValue> {
        self.store.read(&key(path), name).ok().flatten()
    }

    pub fn delete_key(&self, path: &str) -> bool {
        self.store.delete_key(&key(path))
    }

    pub fn write_count(&self) -> u64 {
        self.store.write_count()
    }
}
