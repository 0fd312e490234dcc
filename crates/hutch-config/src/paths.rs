//! File system paths for the telemetry client.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Name of the base directory under the user's home.
const BASE_DIR_NAME: &str = ".hutch";

/// Manages file system paths rooted at `~/.hutch`.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.hutch`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::HomeDirNotFound)?;
        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolve from an optional CLI override, falling back to `~/.hutch`.
    pub fn resolve(base_dir: Option<PathBuf>) -> CoreResult<Self> {
        match base_dir {
            Some(dir) => Ok(Self::with_base_dir(dir)),
            None => Self::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `~/.hutch/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Directory backing the key/value store (`~/.hutch/state`).
    ///
    /// Holds one file per storage key: the outbox, the user id and the
    /// persisted API base.
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("state")
    }

    /// `~/.hutch/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `~/.hutch/logs/telemetry.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("telemetry.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.state_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-hutch");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), base.as_path());
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.state_dir(), base.join("state"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file(), base.join("logs/telemetry.jsonl"));
    }

    #[test]
    fn test_resolve_prefers_override() {
        let base = PathBuf::from("/custom/hutch");
        let paths = Paths::resolve(Some(base.clone())).unwrap();
        assert_eq!(paths.base_dir(), base.as_path());
    }

    #[test]
    fn test_paths_default_under_home() {
        if let Some(home) = dirs::home_dir() {
            let paths = Paths::new().unwrap();
            assert_eq!(paths.base_dir(), home.join(".hutch").as_path());
        }
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("hutch");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());

        paths.ensure_dirs().unwrap();
        // Idempotent.
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.state_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
