//! Reports produced by apply, sweep and check passes

use regkeeper_store::Error as StoreError;
use serde::{Deserialize, Serialize};

use crate::setting::SettingDescriptor;

/// An entry that was rewritten to its desired value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Full entry path, `HKEY_CURRENT_USER\Console\CursorSize`
    pub entry: String,
    /// Value found before the write; `None` when the value was absent or
    /// of a type that cannot be represented
    pub previous: Option<String>,
    /// Value written
    pub value: String,
}

/// Broad classification of a store error, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    KeyNotFound,
    AccessDenied,
    Other,
}

impl From<&StoreError> for FailureKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::KeyNotFound { .. } => Self::KeyNotFound,
            StoreError::AccessDenied { .. } => Self::AccessDenied,
            _ => Self::Other,
        }
    }
}

/// An entry that could not be checked or written this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub entry: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ApplyFailure {
    pub fn new(setting: &SettingDescriptor, err: &StoreError) -> Self {
        Self {
            entry: setting.full_entry_path(),
            kind: FailureKind::from(err),
            message: err.to_string(),
        }
    }
}

/// Outcome of applying a set of settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Number of settings examined
    pub checked: usize,
    pub corrected: Vec<Correction>,
    pub failed: Vec<ApplyFailure>,
}

/// A sweep re-applies every setting; its report has the same shape.
pub type SweepReport = ApplyReport;

impl ApplyReport {
    /// True when nothing had to be written and nothing failed.
    pub fn is_clean(&self) -> bool {
        self.corrected.is_empty() && self.failed.is_empty()
    }

    pub fn merge(&mut self, other: ApplyReport) {
        self.checked += other.checked;
        self.corrected.extend(other.corrected);
        self.failed.extend(other.failed);
    }
}

/// Overall result of a read-only check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Every entry holds its desired value
    Healthy,
    /// Some entries or their keys are absent
    Missing,
    /// Some entries hold a different value or type
    Drifted,
    /// Some entries could not be read at all
    Broken,
}

impl CheckStatus {
    fn severity(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Missing => 1,
            Self::Drifted => 2,
            Self::Broken => 3,
        }
    }

    /// The worse of two statuses: Broken > Drifted > Missing > Healthy.
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Missing => "missing",
            Self::Drifted => "drifted",
            Self::Broken => "broken",
        };
        f.write_str(name)
    }
}

/// An entry that does not hold its desired value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    pub entry: String,
    /// Desired value, `REG_DWORD 25`
    pub expected: String,
    /// Value found, if any
    pub actual: Option<String>,
    /// Human-readable description of the drift
    pub description: String,
}

/// Report from a read-only check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub checked: usize,
    pub drifted: Vec<DriftItem>,
    pub missing: Vec<DriftItem>,
    /// Entries that could not be read
    pub messages: Vec<String>,
}

impl Default for CheckReport {
    fn default() -> Self {
        Self::healthy()
    }
}

impl CheckReport {
    pub fn healthy() -> Self {
        Self {
            status: CheckStatus::Healthy,
            checked: 0,
            drifted: Vec::new(),
            missing: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_missing(missing: Vec<DriftItem>) -> Self {
        Self {
            status: CheckStatus::Missing,
            missing,
            ..Self::healthy()
        }
    }

    pub fn with_drifted(drifted: Vec<DriftItem>) -> Self {
        Self {
            status: CheckStatus::Drifted,
            drifted,
            ..Self::healthy()
        }
    }

    pub fn broken(message: String) -> Self {
        Self {
            status: CheckStatus::Broken,
            messages: vec![message],
            ..Self::healthy()
        }
    }

    /// Combine two reports; the status is the worst of the two.
    pub fn merge(mut self, other: CheckReport) -> Self {
        self.checked += other.checked;
        self.drifted.extend(other.drifted);
        self.missing.extend(other.missing);
        self.messages.extend(other.messages);
        self.status = self.status.worst(other.status);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}
