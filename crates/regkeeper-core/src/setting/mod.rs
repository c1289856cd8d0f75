//! Setting descriptors and their text source
//!
//! A setting is written as one line, `ROOT\Segment\...\Name|KIND|VALUE`.
//! [`parse_lines`] and [`parse_all`] load many lines at once and collect
//! per-line errors instead of stopping at the first one; whether a bad line
//! aborts startup is up to the caller.

mod descriptor;

pub use descriptor::SettingDescriptor;

use regkeeper_store::ValueKind;

/// Why a setting line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("setting must consist of three pipe-delimited fields (path|kind|value): '{line}'")]
    MissingFields { line: String },

    #[error("path '{path}' must have at least a root, one key segment and a value name")]
    TooFewPathSegments { path: String },

    #[error("path '{path}' contains an empty segment")]
    EmptySegment { path: String },

    #[error("unknown registry root '{alias}'")]
    UnknownRoot { alias: String },

    #[error("unknown value kind '{token}'")]
    UnknownKind { token: String },

    #[error("'{literal}' is not a valid {kind} value")]
    InvalidValue { kind: ValueKind, literal: String },

    #[error("value of kind {actual} does not match declared kind {declared}")]
    KindMismatch {
        declared: ValueKind,
        actual: ValueKind,
    },
}

/// A rejected line of a setting source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line (or entry) number
    pub line: usize,
    pub text: String,
    pub error: ParseError,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

/// Result of loading a setting source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Settings that parsed, in source order
    pub settings: Vec<SettingDescriptor>,
    /// Lines that did not parse
    pub errors: Vec<LineError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';')
}

/// Parse a sequence of setting entries, numbering them from 1.
///
/// Blank entries and entries starting with `#` or `;` are skipped.
pub fn parse_all<I, S>(entries: I) -> LoadReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = LoadReport::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let text = entry.as_ref();
        if is_ignorable(text) {
            continue;
        }
        match SettingDescriptor::parse(text) {
            Ok(setting) => report.settings.push(setting),
            Err(error) => report.errors.push(LineError {
                line: index + 1,
                text: text.to_string(),
                error,
            }),
        }
    }
    report
}

/// Parse a multi-line setting source.
pub fn parse_lines(text: &str) -> LoadReport {
    parse_all(text.lines())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_lines_do_not_stop_loading() {
        let source = "\
# cursor
HKCU\\Console\\CursorSize|DWORD|25

HKCU\\Console\\QuickEdit|NOPE|1
; font
HKCU\\Console\\FaceName|REG_SZ|Consolas
";
        let report = parse_lines(source);

        assert_eq!(report.settings.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 4);
        assert!(matches!(
            report.errors[0].error,
            ParseError::UnknownKind { .. }
        ));
        assert!(!report.is_clean());
    }

    #[test]
    fn source_order_is_preserved() {
        let report = parse_all([
            "HKCU\\Console\\B|DWORD|2",
            "HKCU\\Console\\A|DWORD|1",
        ]);
        let names: Vec<_> = report.settings.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn line_error_display_has_line_number() {
        let report = parse_all(["HKCU\\Console\\CursorSize|DWORD|x"]);
        let display = report.errors[0].to_string();
        assert!(display.starts_with("line 1:"), "got: {}", display);
    }
}
