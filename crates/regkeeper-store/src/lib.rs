//! Registry access for RegKeeper
//!
//! Provides the typed vocabulary shared by every crate in the workspace
//! (roots, key paths, value kinds and typed values) and the [`ConfigStore`]
//! / [`KeyWatch`] traits the enforcement engine is written against.
//!
//! Two backends implement them:
//!
//! - [`MemoryStore`]: in-process, available everywhere
//! - `WindowsRegistry`: the live registry, Windows only

pub mod error;
pub mod memory;
pub mod path;
pub mod root;
pub mod store;
pub mod value;

#[cfg(windows)]
pub mod windows;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use path::{KeyId, KeyPath};
pub use root::{RegRoot, UnknownRoot};
pub use store::{ConfigStore, KeyWatch, WaitOutcome};
pub use value::{TypedValue, UnknownKind, ValueKind, values_equal};

#[cfg(windows)]
pub use windows::WindowsRegistry;

use std::sync::Arc;

/// Open the registry of the running platform.
///
/// Fails with [`Error::Unsupported`] where no native registry exists.
pub fn platform_store() -> Result<Arc<dyn ConfigStore>> {
    #[cfg(windows)]
    {
        Ok(Arc::new(WindowsRegistry::new()))
    }

    #[cfg(not(windows))]
    {
        Err(Error::Unsupported)
    }
}
