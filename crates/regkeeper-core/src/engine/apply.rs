//! Read-compare-then-write application of settings

use regkeeper_store::{ConfigStore, Error as StoreError, TypedValue, values_equal};
use tracing::{info, warn};

use super::report::{ApplyFailure, ApplyReport, CheckReport, Correction, DriftItem};
use crate::setting::SettingDescriptor;

/// What an entry held before it was corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorValue {
    Absent,
    Value(TypedValue),
    /// A value of a registry type that settings cannot express
    Unsupported { type_code: u32 },
}

impl PriorValue {
    /// Text form for reports; `None` when there was no value.
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Value(value) => Some(value.to_string()),
            Self::Unsupported { type_code } => Some(format!("<{} value>", type_name(*type_code))),
        }
    }
}

impl std::fmt::Display for PriorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.describe() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<absent>"),
        }
    }
}

fn type_name(type_code: u32) -> String {
    match type_code {
        0 => "REG_NONE".to_string(),
        2 => "REG_EXPAND_SZ".to_string(),
        3 => "REG_BINARY".to_string(),
        5 => "REG_DWORD_BIG_ENDIAN".to_string(),
        6 => "REG_LINK".to_string(),
        7 => "REG_MULTI_SZ".to_string(),
        other => format!("registry type {}", other),
    }
}

/// What happened to a single setting.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Already held the desired value; nothing was written
    Unchanged,
    /// The desired value was written
    Corrected { previous: PriorValue },
    /// The read or the write failed; retried next cycle
    Failed(StoreError),
}

/// Bring one entry to its desired value.
///
/// Writes only when the stored value differs in kind or payload. A value
/// of a type the store cannot represent counts as different.
pub fn apply_setting(store: &dyn ConfigStore, setting: &SettingDescriptor) -> ApplyOutcome {
    let previous = match store.read(setting.key(), setting.name()) {
        Ok(Some(current)) => PriorValue::Value(current),
        Ok(None) => PriorValue::Absent,
        Err(StoreError::UnsupportedValueType { type_code, .. }) => {
            PriorValue::Unsupported { type_code }
        }
        Err(err) => return ApplyOutcome::Failed(err),
    };

    if let PriorValue::Value(current) = &previous
        && values_equal(Some(current), setting.value())
    {
        return ApplyOutcome::Unchanged;
    }

    match store.write(setting.key(), setting.name(), setting.value()) {
        Ok(()) => ApplyOutcome::Corrected { previous },
        Err(err) => ApplyOutcome::Failed(err),
    }
}

/// Fold one outcome into `report`, logging corrections and failures.
pub(crate) fn record(report: &mut ApplyReport, setting: &SettingDescriptor, outcome: ApplyOutcome) {
    report.checked += 1;
    match outcome {
        ApplyOutcome::Unchanged => {}
        ApplyOutcome::Corrected { previous } => {
            let entry = setting.full_entry_path();
            info!(
                previous = %previous,
                "{} reset to {}",
                entry,
                setting.value()
            );
            report.corrected.push(Correction {
                entry,
                previous: previous.describe(),
                value: setting.value().to_string(),
            });
        }
        ApplyOutcome::Failed(err) => {
            warn!(error = %err, "skipping {} this cycle", setting.full_entry_path());
            report.failed.push(ApplyFailure::new(setting, &err));
        }
    }
}

/// Apply `settings` in order. Failures never stop the remaining settings.
pub fn apply_settings(store: &dyn ConfigStore, settings: &[SettingDescriptor]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for setting in settings {
        let outcome = apply_setting(store, setting);
        record(&mut report, setting, outcome);
    }
    report
}

fn describe(value: &TypedValue) -> String {
    format!("{} {}", value.kind(), value)
}

/// Compare `settings` with the store without writing anything.
pub fn check_settings(store: &dyn ConfigStore, settings: &[SettingDescriptor]) -> CheckReport {
    let mut report = CheckReport::healthy();

    for setting in settings {
        let entry = setting.full_entry_path();
        let expected = describe(setting.value());

        let single = match store.read(setting.key(), setting.name()) {
            Ok(Some(current)) if values_equal(Some(&current), setting.value()) => {
                CheckReport::healthy()
            }
            Ok(Some(current)) => CheckReport::with_drifted(vec![DriftItem {
                entry,
                actual: Some(describe(&current)),
                description: format!("holds {} instead of {}", describe(&current), expected),
                expected,
            }]),
            Ok(None) => CheckReport::with_missing(vec![DriftItem {
                entry,
                expected,
                actual: None,
                description: "value is absent".to_string(),
            }]),
            Err(StoreError::KeyNotFound { key }) => CheckReport::with_missing(vec![DriftItem {
                entry,
                expected,
                actual: None,
                description: format!("key {} does not exist", key),
            }]),
            Err(StoreError::UnsupportedValueType { type_code, .. }) => {
                let actual = PriorValue::Unsupported { type_code }.to_string();
                CheckReport::with_drifted(vec![DriftItem {
                    entry,
                    description: format!("holds {} instead of {}", actual, expected),
                    expected,
                    actual: Some(actual),
                }])
            }
            Err(err) => CheckReport::broken(format!("{}: {}", entry, err)),
        };

        report = report.merge(CheckReport {
            checked: 1,
            ..single
        });
    }

    report
}
