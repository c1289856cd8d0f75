//! Start-at-logon registration
//!
//! RegKeeper launches itself at logon through a value under the per-user
//! `Run` key. The value is written when `auto_start` is on and removed when
//! it is off.

use std::path::Path;

use regkeeper_store::{ConfigStore, KeyPath, RegRoot, Result, TypedValue, values_equal};

/// Name of the value under the `Run` key.
pub const VALUE_NAME: &str = "RegKeeper";

/// `HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Run`
pub fn run_key() -> KeyPath {
    KeyPath::new(
        RegRoot::CurrentUser,
        ["SOFTWARE", "Microsoft", "Windows", "CurrentVersion", "Run"],
    )
}

/// Command line stored in the `Run` value.
pub fn launch_command(exe: &Path, config: Option<&Path>) -> String {
    match config {
        Some(config) => format!("\"{}\" --config \"{}\" run", exe.display(), config.display()),
        None => format!("\"{}\" run", exe.display()),
    }
}

/// What [`sync_registration`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    Removed,
    Unchanged,
}

/// Make the `Run` value match `enabled`.
///
/// Writes only when the stored command differs; removing an absent value
/// is not an error.
pub fn sync_registration(store: &dyn ConfigStore, enabled: bool, command: &str) -> Result<Registration> {
    let key = run_key();
    let current = store.read(&key, VALUE_NAME)?;

    if enabled {
        let desired = TypedValue::String(command.to_string());
        if values_equal(current.as_ref(), &desired) {
            return Ok(Registration::Unchanged);
        }
        store.write(&key, VALUE_NAME, &desired)?;
        Ok(Registration::Registered)
    } else if current.is_some() {
        store.delete_value(&key, VALUE_NAME)?;
        Ok(Registration::Removed)
    } else {
        Ok(Registration::Unchanged)
    }
}
