//! Typed registry values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry value types that can be enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// `REG_SZ`
    String,
    /// `REG_DWORD`, 32-bit unsigned
    DWord,
    /// `REG_QWORD`, 64-bit unsigned
    QWord,
}

impl ValueKind {
    /// Canonical `REG_*` token.
    pub fn token(self) -> &'static str {
        match self {
            Self::String => "REG_SZ",
            Self::DWord => "REG_DWORD",
            Self::QWord => "REG_QWORD",
        }
    }

    /// Resolve a kind token, ignoring ASCII case.
    ///
    /// Accepts the `REG_*` form as well as the bare `SZ`/`STRING`,
    /// `DWORD` and `QWORD` spellings.
    pub fn from_token(token: &str) -> Option<Self> {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "REG_SZ" | "SZ" | "STRING" => Some(Self::String),
            "REG_DWORD" | "DWORD" => Some(Self::DWord),
            "REG_QWORD" | "QWORD" => Some(Self::QWord),
            _ => None,
        }
    }

    /// Convert a literal into a value of this kind.
    ///
    /// Integers are decimal, surrounding whitespace ignored. Strings are
    /// taken verbatim.
    pub fn parse_value(self, literal: &str) -> Option<TypedValue> {
        match self {
            Self::String => Some(TypedValue::String(literal.to_string())),
            Self::DWord => literal.trim().parse().ok().map(TypedValue::DWord),
            Self::QWord => literal.trim().parse().ok().map(TypedValue::QWord),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Error returned when a kind token is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown value kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ValueKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A registry value together with its type.
///
/// Equality is kind-aware: `DWord(1)` never equals `QWord(1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedValue {
    String(String),
    DWord(u32),
    QWord(u64),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::DWord(_) => ValueKind::DWord,
            Self::QWord(_) => ValueKind::QWord,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::DWord(v) => write!(f, "{}", v),
            Self::QWord(v) => write!(f, "{}", v),
        }
    }
}

/// Compare a stored value with a desired one.
///
/// Both the kind tag and the payload must match. An absent stored value
/// never matches.
pub fn values_equal(current: Option<&TypedValue>, desired: &TypedValue) -> bool {
    current.is_some_and(|current| current == desired)
}
