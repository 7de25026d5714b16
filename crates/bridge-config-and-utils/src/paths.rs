//! File system paths for the bridge processes.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory under the home directory holding all runtime files.
const BASE_DIR_NAME: &str = ".wei-bridge";
/// Snapshot file read by the file-backed assessment engine.
const ASSESSMENT_FILE_NAME: &str = "assessment.json";

/// Manages file system paths for the bridge.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.wei-bridge)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.wei-bridge`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.wei-bridge).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.wei-bridge/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Socket a named service listens on (~/.wei-bridge/<service>.sock).
    pub fn socket_file(&self, service_name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.sock", service_name))
    }

    /// Get the assessment snapshot path (~/.wei-bridge/assessment.json).
    pub fn assessment_file(&self) -> PathBuf {
        self.base_dir.join(ASSESSMENT_FILE_NAME)
    }

    /// Get the logs directory (~/.wei-bridge/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL log file for one process (~/.wei-bridge/logs/<service>.jsonl).
    pub fn log_file(&self, service: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.jsonl", service))
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
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
        let base = PathBuf::from("/tmp/test-wei-bridge");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(
            paths.socket_file("CommunicationService"),
            base.join("CommunicationService.sock")
        );
        assert_eq!(paths.assessment_file(), base.join("assessment.json"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file("wei-helper"), base.join("logs/wei-helper.jsonl"));
    }

    #[test]
    fn test_paths_default() {
        let paths = Paths::new().unwrap();
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.base_dir(), &home.join(".wei-bridge"));
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("wei-bridge");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());
        assert!(!paths.logs_dir().exists());

        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.logs_dir().is_dir());
    }

    #[test]
    fn test_ensure_dirs_idempotent() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.logs_dir().exists());
    }

    #[test]
    fn test_log_file_is_inside_logs_dir() {
        let paths = Paths::with_base_dir(PathBuf::from("/test/logs"));
        assert!(paths.log_file("wei-frontend").starts_with(paths.logs_dir()));
    }
}
