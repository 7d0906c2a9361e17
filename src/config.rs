//! Configuration management module.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::UploadKind;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Tally backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Opaque bearer token issued by the backend.
    #[serde(default)]
    pub token: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Defaults applied when creating employees from an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub default_kind: UploadKind,
    /// Shift start for new employees, `HH:MM`.
    pub shift_start_time: String,
    /// Shift end for new employees, `HH:MM`.
    pub shift_end_time: String,
}

/// UI preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Also write logs to a rolling file in the data directory.
    pub log_to_file: bool,
}

impl AppConfig {
    /// Get config file path (same directory as executable).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        directories::ProjectDirs::from("io", "tally", "tally-import")
            .map(|dirs| dirs.data_local_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Validation("API base URL cannot be empty".to_string()));
        }
        if !base_url.starts_with("http") {
            return Err(ConfigError::Validation(
                "API base URL must start with http:// or https://".to_string(),
            ));
        }
        if self.api.timeout_secs < 5 {
            return Err(ConfigError::Validation(
                "API timeout must be at least 5 seconds".to_string(),
            ));
        }
        let start = parse_shift_time(&self.import.shift_start_time)
            .ok_or_else(|| ConfigError::Validation("Shift start time must be HH:MM".to_string()))?;
        let end = parse_shift_time(&self.import.shift_end_time)
            .ok_or_else(|| ConfigError::Validation("Shift end time must be HH:MM".to_string()))?;
        if start == end {
            return Err(ConfigError::Validation(
                "Shift start and end time cannot be equal".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parse a shift time in `HH:MM` form.
pub fn parse_shift_time(input: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").ok()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_kind: UploadKind::Attendance,
            shift_start_time: "09:00".to_string(),
            shift_end_time: "18:00".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { log_to_file: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_base_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_base_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "ftp://invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_timeout_bounds() {
        let mut config = AppConfig::default();

        config.api.timeout_secs = 4;
        assert!(config.validate().is_err());

        config.api.timeout_secs = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_shift_times() {
        let mut config = AppConfig::default();
        config.import.shift_start_time = "9am".to_string();
        assert!(config.validate().is_err());

        config.import.shift_start_time = "18:00".to_string();
        assert!(config.validate().is_err());

        config.import.shift_start_time = "22:00".to_string();
        config.import.shift_end_time = "06:00".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let content = r#"
            [api]
            base_url = "https://tally.example.com"
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.api.token.is_empty());
        assert_eq!(config.import.default_kind, UploadKind::Attendance);
        assert_eq!(config.import.shift_end_time, "18:00");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("tally-import-config-{}.toml", std::process::id()));
        let mut config = AppConfig::default();
        config.api.token = "secret".to_string();
        config.import.default_kind = UploadKind::Salary;
        config.save(&path).unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(loaded) => {
                assert_eq!(loaded.api.token, "secret");
                assert_eq!(loaded.import.default_kind, UploadKind::Salary);
            }
            other => panic!("unexpected load result: {other:?}"),
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/tally-import/config.toml");
        assert!(matches!(AppConfig::try_load(path), ConfigLoadResult::Missing));
    }
}
