//! The desired state of one registry entry

use regkeeper_store::{KeyId, KeyPath, RegRoot, TypedValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ParseError;

/// One enforced registry entry: key, value name and desired typed value.
///
/// Immutable once built. The text form is
/// `ROOT\Segment\...\Name|KIND|VALUE`, e.g. `HKCU\Console\CursorSize|DWORD|25`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettingDescriptor {
    key: KeyPath,
    name: String,
    value: TypedValue,
}

impl SettingDescriptor {
    /// Build a descriptor whose kind is taken from `value`.
    pub fn new(key: KeyPath, name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            key,
            name: name.into(),
            value,
        }
    }

    /// Build a descriptor with an explicitly declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::KindMismatch`] when `value` is not of `kind`.
    pub fn with_kind(
        key: KeyPath,
        name: impl Into<String>,
        kind: ValueKind,
        value: TypedValue,
    ) -> Result<Self, ParseError> {
        if value.kind() != kind {
            return Err(ParseError::KindMismatch {
                declared: kind,
                actual: value.kind(),
            });
        }
        Ok(Self::new(key, name, value))
    }

    /// Parse the single-line text form.
    ///
    /// The line is split on the first two `|`; the value is everything after
    /// the second one, so string values may contain `|`. The path needs a
    /// root, at least one key segment and a value name.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let line = text.trim_start().trim_end_matches(['\r', '\n']);

        let mut fields = line.splitn(3, '|');
        let (Some(path), Some(kind), Some(literal)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(ParseError::MissingFields {
                line: line.to_string(),
            });
        };

        let segments: Vec<&str> = path.split('\\').collect();
        if segments.len() < 3 {
            return Err(ParseError::TooFewPathSegments {
                path: path.to_string(),
            });
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ParseError::EmptySegment {
                path: path.to_string(),
            });
        }

        let root = RegRoot::from_alias(segments[0]).ok_or_else(|| ParseError::UnknownRoot {
            alias: segments[0].to_string(),
        })?;
        let name = segments[segments.len() - 1];
        let key = KeyPath::new(root, segments[1..segments.len() - 1].iter().copied());

        let kind = ValueKind::from_token(kind.trim()).ok_or_else(|| ParseError::UnknownKind {
            token: kind.trim().to_string(),
        })?;
        let value = kind
            .parse_value(literal)
            .ok_or_else(|| ParseError::InvalidValue {
                kind,
                literal: literal.to_string(),
            })?;

        Ok(Self::new(key, name, value))
    }

    pub fn root(&self) -> RegRoot {
        self.key.root()
    }

    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    /// Segments below the root.
    pub fn key_path(&self) -> &[String] {
        self.key.segments()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Grouping identity of the containing key.
    pub fn key_id(&self) -> KeyId {
        self.key.id()
    }

    /// `HKEY_CURRENT_USER\Console`
    pub fn full_key_path(&self) -> String {
        self.key.to_string()
    }

    /// `HKEY_CURRENT_USER\Console\CursorSize`
    pub fn full_entry_path(&self) -> String {
        format!("{}\\{}", self.key, self.name)
    }
}

impl fmt::Display for SettingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root().short_name())?;
        for segment in self.key.segments() {
            write!(f, "\\{}", segment)?;
        }
        write!(f, "\\{}|{}|{}", self.name, self.kind(), self.value)
    }
}

impl std::str::FromStr for SettingDescriptor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
