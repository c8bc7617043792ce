//! Configuration management for Slack Watchman.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Command-line flags are applied on top by
//! the binary.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/slack-watchman/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API client settings
    pub api: ApiConfig,
    /// Scanning behavior settings
    pub scanning: ScanningConfig,
    /// Signature loading settings
    pub signatures: SignaturesConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file, falling back to defaults if it
    /// does not exist.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read, is not valid TOML,
    /// or contains out-of-range values.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let config: Self = if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            tracing::debug!("Config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default path with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `WATCHMAN_SIGNATURES_DIR`: Override the signature root directory
    /// - `WATCHMAN_CORES`: Override the worker count
    /// - `WATCHMAN_API_BASE_URL`: Override the API base URL
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using the given variable lookup.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("WATCHMAN_SIGNATURES_DIR") {
            tracing::debug!("Override signatures.dir from env: {}", dir);
            self.signatures.dir = PathBuf::from(dir);
        }

        if let Some(val) = lookup("WATCHMAN_CORES") {
            if let Ok(cores) = val.parse() {
                self.scanning.cores = Some(cores);
                tracing::debug!("Override scanning.cores from env: {}", cores);
            }
        }

        if let Some(url) = lookup("WATCHMAN_API_BASE_URL") {
            tracing::debug!("Override api.base_url from env: {}", url);
            self.api.base_url = url;
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        if !(1..=1000).contains(&self.api.page_limit) {
            return Err(ConfigError::InvalidValue {
                field: "api.page_limit".to_string(),
                reason: format!("must be 1-1000, got {}", self.api.page_limit),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/slack-watchman/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "watchman", "slack-watchman")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Web API
    pub base_url: String,
    /// Page size sent as the `limit` parameter
    pub page_limit: u32,
    /// Hard per-call timeout in seconds
    pub timeout_secs: u64,
    /// Cooldown after a `ratelimited` response, in seconds
    pub rate_limit_cooldown_secs: u64,
    /// Retries allowed after `ratelimited` before giving up
    pub max_rate_limit_retries: u32,
    /// Retries allowed after a network failure before giving up
    pub max_transport_retries: u32,
    /// Base delay between network retries in milliseconds
    pub transport_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://slack.com/api".to_string(),
            page_limit: 1000,
            timeout_secs: 30,
            rate_limit_cooldown_secs: 60,
            max_rate_limit_retries: 3,
            max_transport_retries: 3,
            transport_retry_delay_ms: 1000,
            user_agent: concat!("slack-watchman/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Scanning behavior settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Requested worker count; `None` picks a value from the detected CPU count
    pub cores: Option<usize>,
}

/// How the signature loader treats files that fail to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// Attempt every file, then fail with the first failure
    #[default]
    FirstError,
    /// Attempt every file, then fail with all failures at once
    Aggregate,
    /// Log failures and keep the files that loaded
    SkipInvalid,
}

/// Signature loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturesConfig {
    /// Root directory of the signature tree
    pub dir: PathBuf,
    /// Failure policy while loading
    pub policy: LoadPolicy,
    /// Run embedded test cases at load time
    pub self_test: bool,
}

impl Default for SignaturesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("signatures"),
            policy: LoadPolicy::FirstError,
            self_test: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "https://slack.com/api");
        assert_eq!(config.api.page_limit, 1000);
        assert_eq!(config.api.rate_limit_cooldown_secs, 60);
        assert_eq!(config.scanning.cores, None);
        assert_eq!(config.signatures.policy, LoadPolicy::FirstError);
        assert!(config.signatures.self_test);
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
[api]
timeout_secs = 10

[signatures]
policy = "skip-invalid"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.page_limit, 1000);
        assert_eq!(config.signatures.policy, LoadPolicy::SkipInvalid);
        assert_eq!(config.signatures.dir, PathBuf::from("signatures"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config =
            AppConfig::load_from(&temp_dir.path().join("absent.toml")).expect("load defaults");
        assert_eq!(config.api.max_rate_limit_retries, 3);
    }

    #[test]
    fn test_load_from_rejects_out_of_range_page_limit() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[api]\npage_limit = 5000\n").expect("write config");

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "api.page_limit"));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[api\n").expect("write config");

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("WATCHMAN_SIGNATURES_DIR", "/opt/signatures"),
            ("WATCHMAN_CORES", "4"),
            ("WATCHMAN_API_BASE_URL", "http://localhost:9999/api"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.signatures.dir, PathBuf::from("/opt/signatures"));
        assert_eq!(config.scanning.cores, Some(4));
        assert_eq!(config.api.base_url, "http://localhost:9999/api");
    }

    #[test]
    fn test_env_override_ignores_unparseable_cores() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| (key == "WATCHMAN_CORES").then(|| "many".to_string()));
        assert_eq!(config.scanning.cores, None);
    }
}
