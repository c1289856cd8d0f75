//! Native Windows registry backend
//!
//! Values are read and written through `winreg` in the 64-bit registry view.
//! Change notification uses `RegNotifyChangeKeyValue` in asynchronous mode
//! with an auto-reset event: arming registers the event, waiting blocks on
//! it, and closing the key handle signals it, which is how a blocked wait is
//! cancelled.

use std::io;
use std::iter;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_KEY_DELETED, ERROR_SUCCESS,
    HANDLE, WAIT_OBJECT_0,
};
use windows_sys::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_PERFORMANCE_DATA, HKEY_USERS, KEY_NOTIFY, KEY_READ, KEY_SET_VALUE, KEY_WOW64_64KEY,
    REG_NOTIFY_CHANGE_LAST_SET, RegCloseKey, RegNotifyChangeKeyValue, RegOpenKeyExW,
};
use windows_sys::Win32::System::Threading::{CreateEventW, INFINITE, SetEvent, WaitForSingleObject};
use winreg::enums::RegType;
use winreg::types::{FromRegValue, ToRegValue};
use winreg::{RegKey, RegValue};

use crate::store::{ConfigStore, KeyWatch, WaitOutcome};
use crate::{Error, KeyPath, RegRoot, Result, TypedValue};

fn root_hkey(root: RegRoot) -> HKEY {
    match root {
        RegRoot::ClassesRoot => HKEY_CLASSES_ROOT,
        RegRoot::CurrentUser => HKEY_CURRENT_USER,
        RegRoot::LocalMachine => HKEY_LOCAL_MACHINE,
        RegRoot::Users => HKEY_USERS,
        RegRoot::CurrentConfig => HKEY_CURRENT_CONFIG,
        RegRoot::PerformanceData => HKEY_PERFORMANCE_DATA,
    }
}

fn map_key_error(key: &KeyPath, error: io::Error) -> Error {
    match error.raw_os_error() {
        Some(code) if code == ERROR_FILE_NOT_FOUND as i32 || code == ERROR_KEY_DELETED as i32 => {
            Error::key_not_found(key)
        }
        Some(code) if code == ERROR_ACCESS_DENIED as i32 => Error::access_denied(key),
        _ => Error::io(key, error),
    }
}

fn map_status(key: &KeyPath, status: u32) -> Error {
    map_key_error(key, io::Error::from_raw_os_error(status as i32))
}

fn decode(key: &KeyPath, name: &str, raw: &RegValue) -> Result<TypedValue> {
    let decoded = match raw.vtype {
        RegType::REG_SZ => String::from_reg_value(raw).map(TypedValue::String),
        RegType::REG_DWORD => u32::from_reg_value(raw).map(TypedValue::DWord),
        RegType::REG_QWORD => u64::from_reg_value(raw).map(TypedValue::QWord),
        ref other => {
            return Err(Error::UnsupportedValueType {
                key: key.to_string(),
                name: name.to_string(),
                type_code: other.clone() as u32,
            });
        }
    };
    decoded.map_err(|e| Error::io(key, e))
}

fn encode(value: &TypedValue) -> RegValue {
    match value {
        TypedValue::String(s) => s.to_reg_value(),
        TypedValue::DWord(v) => v.to_reg_value(),
        TypedValue::QWord(v) => v.to_reg_value(),
    }
}

/// The live Windows registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, key: &KeyPath, access: u32) -> Result<RegKey> {
        RegKey::predef(root_hkey(key.root()))
            .open_subkey_with_flags(key.sub_key(), access | KEY_WOW64_64KEY)
            .map_err(|e| map_key_error(key, e))
    }
}

impl ConfigStore for WindowsRegistry {
    fn read(&self, key: &KeyPath, name: &str) -> Result<Option<TypedValue>> {
        let handle = self.open(key, KEY_READ)?;
        match handle.get_raw_value(name) {
            Ok(raw) => decode(key, name, &raw).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_key_error(key, e)),
        }
    }

    fn write(&self, key: &KeyPath, name: &str, value: &TypedValue) -> Result<()> {
        let handle = self.open(key, KEY_SET_VALUE)?;
        handle
            .set_raw_value(name, &encode(value))
            .map_err(|e| map_key_error(key, e))
    }

    fn delete_value(&self, key: &KeyPath, name: &str) -> Result<()> {
        let handle = self.open(key, KEY_SET_VALUE)?;
        match handle.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_key_error(key, e)),
        }
    }

    fn open_watch(&self, key: &KeyPath) -> Result<Box<dyn KeyWatch>> {
        Ok(Box::new(WindowsWatch::open(key)?))
    }
}

/// `RegNotifyChangeKeyValue` subscription on one key and its subtree.
pub struct WindowsWatch {
    key: KeyPath,
    hkey: Mutex<Option<HKEY>>,
    event: HANDLE,
    closed: AtomicBool,
}

impl WindowsWatch {
    fn open(key: &KeyPath) -> Result<Self> {
        let sub_key: Vec<u16> = key.sub_key().encode_utf16().chain(iter::once(0)).collect();
        let mut hkey: HKEY = 0;
        // SAFETY: `sub_key` is NUL-terminated and outlives the call; `hkey` is a valid out pointer.
        let status = unsafe {
            RegOpenKeyExW(
                root_hkey(key.root()),
                sub_key.as_ptr(),
                0,
                KEY_NOTIFY | KEY_READ | KEY_WOW64_64KEY,
                &mut hkey,
            )
        };
        if status != ERROR_SUCCESS {
            return Err(map_status(key, status));
        }

        // SAFETY: unnamed auto-reset event with default security.
        let event = unsafe { CreateEventW(ptr::null(), 0, 0, ptr::null()) };
        if event == 0 {
            let error = io::Error::last_os_error();
            // SAFETY: `hkey` was opened above and is not shared yet.
            unsafe { RegCloseKey(hkey) };
            return Err(Error::io(key, error));
        }

        Ok(Self {
            key: key.clone(),
            hkey: Mutex::new(Some(hkey)),
            event,
            closed: AtomicBool::new(false),
        })
    }
}

impl KeyWatch for WindowsWatch {
    fn arm(&self) -> Result<()> {
        let guard = self.hkey.lock();
        let Some(hkey) = *guard else {
            return Err(Error::WatchFailed {
                key: self.key.to_string(),
                message: "handle is closed".into(),
            });
        };
        // SAFETY: `hkey` stays open while the lock is held; `event` lives as long as `self`.
        let status = unsafe {
            RegNotifyChangeKeyValue(hkey, 1, REG_NOTIFY_CHANGE_LAST_SET, self.event, 1)
        };
        match status {
            ERROR_SUCCESS => Ok(()),
            ERROR_KEY_DELETED => Err(Error::key_not_found(&self.key)),
            ERROR_ACCESS_DENIED => Err(Error::access_denied(&self.key)),
            other => Err(Error::WatchFailed {
                key: self.key.to_string(),
                message: io::Error::from_raw_os_error(other as i32).to_string(),
            }),
        }
    }

    fn wait(&self) -> WaitOutcome {
        if self.closed.load(Ordering::SeqCst) {
            return WaitOutcome::Closed;
        }
        // SAFETY: `event` is a valid handle until drop.
        let result = unsafe { WaitForSingleObject(self.event, INFINITE) };
        if self.closed.load(Ordering::SeqCst) || result != WAIT_OBJECT_0 {
            WaitOutcome::Closed
        } else {
            WaitOutcome::Signaled
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(hkey) = self.hkey.lock().take() {
            trace!(key = %self.key, "Closing registry watch handle");
            // SAFETY: the handle was taken out of the slot, so nobody else uses it.
            unsafe { RegCloseKey(hkey) };
        }
        // SAFETY: `event` is a valid handle until drop.
        unsafe { SetEvent(self.event) };
    }
}

impl Drop for WindowsWatch {
    fn drop(&mut self) {
        self.close();
        // SAFETY: created in `open`, closed exactly once here.
        unsafe { CloseHandle(self.event) };
    }
}
