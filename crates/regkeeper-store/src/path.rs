//! Registry key paths

use crate::RegRoot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A key under one of the registry roots.
///
/// Segments keep the spelling they were created with; use [`KeyPath::id`]
/// to compare keys the way the registry does (case-insensitively).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath {
    root: RegRoot,
    segments: Vec<String>,
}

impl KeyPath {
    pub fn new<I, S>(root: RegRoot, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn root(&self) -> RegRoot {
        self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path below the root, joined with backslashes (`Console\TrueTypeFont`).
    pub fn sub_key(&self) -> String {
        self.segments.join("\\")
    }

    /// Case-insensitive identity of this key.
    pub fn id(&self) -> KeyId {
        KeyId::new(self)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root.long_name())?;
        for segment in &self.segments {
            write!(f, "\\{}", segment)?;
        }
        Ok(())
    }
}

/// Normalized identity of a key: root plus upper-cased segments.
///
/// Two paths that differ only in letter case or in the alias used for the
/// root produce the same `KeyId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId {
    root: RegRoot,
    normalized: String,
}

impl KeyId {
    fn new(path: &KeyPath) -> Self {
        Self {
            root: path.root,
            normalized: path.sub_key().to_uppercase(),
        }
    }

    pub fn root(&self) -> RegRoot {
        self.root
    }

    /// Upper-cased sub key below the root.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.root.long_name(), self.normalized)
    }
}

impl From<&KeyPath> for KeyId {
    fn from(path: &KeyPath) -> Self {
        Self::new(path)
    }
}
