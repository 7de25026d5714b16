//! Configuration for the helper, front-end and elevation launch.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default peer identity presented on `open` (can be overridden at compile time via WEI_PEER_IDENTITY).
pub const DEFAULT_PEER_IDENTITY: &str = match option_env!("WEI_PEER_IDENTITY") {
    Some(identity) => identity,
    None => "wei-bridge",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the service the front-end exposes.
pub const DEFAULT_SERVICE_NAME: &str = "CommunicationService";

const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ELEVATION_TIMEOUT_SECS: u64 = 180;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Named service the helper connects to.
    pub service_name: String,
    /// Identity the helper presents when opening the channel.
    pub peer_identity: String,
    /// Bound on the `open` handshake, in seconds.
    pub open_timeout_secs: u64,
    /// How long to wait for the elevated process, in seconds.
    pub elevation_timeout_secs: u64,
    /// Program run with elevation for a formal assessment.
    pub formal_assessment_program: String,
    /// Extra arguments for the formal-assessment program. The helper always
    /// passes `--base-dir` and `--snapshot` ahead of these.
    pub formal_assessment_args: Vec<String>,
    /// Command prefix that performs the elevation, e.g. `["pkexec"]`.
    /// Empty runs the program directly.
    pub elevation_wrapper: Vec<String>,
    /// Wrapper exit codes that mean the user refused consent.
    pub declined_exit_codes: Vec<i32>,
    /// Helper program the front-end launches.
    pub helper_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            peer_identity: DEFAULT_PEER_IDENTITY.to_string(),
            open_timeout_secs: DEFAULT_OPEN_TIMEOUT_SECS,
            elevation_timeout_secs: DEFAULT_ELEVATION_TIMEOUT_SECS,
            formal_assessment_program: "wei-formal-assessment".to_string(),
            formal_assessment_args: Vec::new(),
            elevation_wrapper: vec!["pkexec".to_string()],
            // pkexec exits 126 when the prompt is dismissed. 127 also covers
            // launch errors, so it is not treated as a refusal.
            declined_exit_codes: vec![126],
            helper_program: "wei-helper".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    pub fn elevation_timeout(&self) -> Duration {
        Duration::from_secs(self.elevation_timeout_secs)
    }

    /// Reject values the processes cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(CoreError::Config("service_name must not be empty".to_string()));
        }
        if self.formal_assessment_program.trim().is_empty() {
            return Err(CoreError::Config(
                "formal_assessment_program must not be empty".to_string(),
            ));
        }
        if self.open_timeout_secs == 0 {
            return Err(CoreError::Config("open_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `WEI_LOG_LEVEL` and `WEI_ELEVATION_TIMEOUT_SECS` from `lookup`.
    /// Unparseable timeouts are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(log_level) = lookup("WEI_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.log_level = log_level;
        }
        if let Some(secs) = lookup("WEI_ELEVATION_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.elevation_timeout_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.service_name, "CommunicationService");
        assert_eq!(config.open_timeout(), Duration::from_secs(10));
        assert_eq!(config.elevation_timeout(), Duration::from_secs(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "elevation_wrapper": [] }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.elevation_wrapper.is_empty());
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.declined_exit_codes, vec![126]);
        assert!(config.formal_assessment_args.is_empty());
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.formal_assessment_program = "/opt/wei/bin/wei-formal-assessment".to_string();
        config.declined_exit_codes = vec![5];

        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_config_load_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), r#"{ "service_name": "  " }"#).unwrap();

        assert!(matches!(Config::load(&paths), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            "WEI_LOG_LEVEL" => Some("trace".to_string()),
            "WEI_ELEVATION_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        });

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.elevation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_unparseable_timeout_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            "WEI_ELEVATION_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });

        assert_eq!(config.elevation_timeout_secs, 180);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_zero_open_timeout_is_rejected() {
        let mut config = Config::default();
        config.open_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
