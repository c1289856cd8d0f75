//! Registry roots (hives)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the predefined top-level registry keys.
///
/// Every root has a short alias (`HKCU`) and a long alias
/// (`HKEY_CURRENT_USER`); both resolve to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegRoot {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
    PerformanceData,
}

impl RegRoot {
    pub const ALL: [RegRoot; 6] = [
        RegRoot::ClassesRoot,
        RegRoot::CurrentUser,
        RegRoot::LocalMachine,
        RegRoot::Users,
        RegRoot::CurrentConfig,
        RegRoot::PerformanceData,
    ];

    /// Short alias, e.g. `HKCU`.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKCR",
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
            Self::PerformanceData => "HKPD",
        }
    }

    /// Long alias, e.g. `HKEY_CURRENT_USER`.
    pub fn long_name(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKEY_CLASSES_ROOT",
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
            Self::Users => "HKEY_USERS",
            Self::CurrentConfig => "HKEY_CURRENT_CONFIG",
            Self::PerformanceData => "HKEY_PERFORMANCE_DATA",
        }
    }

    /// Resolve either alias, ignoring ASCII case.
    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|root| {
            root.short_name().eq_ignore_ascii_case(alias)
                || root.long_name().eq_ignore_ascii_case(alias)
        })
    }
}

impl fmt::Display for RegRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

/// Error returned when a root alias is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown registry root '{0}'")]
pub struct UnknownRoot(pub String);

impl FromStr for RegRoot {
    type Err = UnknownRoot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| UnknownRoot(s.to_string()))
    }
}
