//! Locating `regkeeper.toml`

use std::env;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "regkeeper.toml";

/// Places searched for the config file when no path is given, in order:
/// next to the executable, the working directory, then
/// `<config_dir>/regkeeper/`.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("regkeeper").join(CONFIG_FILE_NAME));
    }

    candidates.dedup();
    candidates
}

/// Pick the configuration file to load.
///
/// An explicit path must exist. Otherwise the first existing
/// [`candidate_paths`] entry wins.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let candidates = candidate_paths();
    for candidate in &candidates {
        if candidate.is_file() {
            tracing::debug!(?candidate, "using configuration");
            return Ok(candidate.clone());
        }
        tracing::trace!(?candidate, "no configuration here");
    }

    Err(Error::ConfigNotFound {
        path: candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");

        let err = resolve_config_path(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { path } if path == missing));
    }

    #[test]
    fn explicit_path_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "").unwrap();

        assert_eq!(resolve_config_path(Some(&path)).unwrap(), path);
    }

    #[test]
    fn candidates_end_in_the_file_name() {
        for candidate in candidate_paths() {
            assert!(candidate.ends_with(CONFIG_FILE_NAME), "{:?}", candidate);
        }
    }
}
