//! Engine configuration.
//!
//! Read from an optional YAML file, then overridden by `MESS_DUES_*`
//! environment variables, then validated:
//!
//! ```yaml
//! api_base_url: http://localhost:8080
//! max_attempts: 4
//! initial_delay_ms: 1000
//! request_timeout_secs: 15
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::io::rest::fetcher::RetryPolicy;

pub const ENV_API_BASE_URL: &str = "MESS_DUES_API_BASE_URL";
pub const ENV_MAX_ATTEMPTS: &str = "MESS_DUES_MAX_ATTEMPTS";
pub const ENV_INITIAL_DELAY_MS: &str = "MESS_DUES_INITIAL_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MESS_DUES_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(u32),
    #[error("initial retry delay must be greater than zero")]
    InvalidInitialDelay,
    #[error("request timeout must be greater than zero")]
    InvalidRequestTimeout,
    #[error("invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("environment variable {var} has invalid value {value:?}")]
    InvalidEnvValue { var: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base_url: String,
    /// Total attempts per request, the first one included
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            max_attempts: 4,
            initial_delay_ms: 1000,
            request_timeout_secs: 15,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        info!(
            "Engine configured for {} ({} attempts, {}ms initial delay)",
            config.api_base_url, config.max_attempts, config.initial_delay_ms
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Apply `MESS_DUES_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = parse_env(ENV_MAX_ATTEMPTS, value)?;
        }
        if let Some(value) = lookup(ENV_INITIAL_DELAY_MS) {
            self.initial_delay_ms = parse_env(ENV_INITIAL_DELAY_MS, value)?;
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_env(ENV_REQUEST_TIMEOUT_SECS, value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_policy()?;
        self.base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.initial_delay_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.api_base_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(url)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().unwrap(), RetryPolicy::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_yaml_file_with_partial_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.yaml");
        fs::write(&path, "api_base_url: https://mess.example.com/api\nmax_attempts: 2\n").unwrap();

        let config = EngineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.api_base_url, "https://mess.example.com/api");
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.initial_delay_ms, 1000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = EngineConfig::load(Some(&temp_dir.path().join("absent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_API_BASE_URL, "http://10.0.0.5:9000"),
                (ENV_MAX_ATTEMPTS, " 3 "),
                (ENV_INITIAL_DELAY_MS, "250"),
            ]))
            .unwrap();

        assert_eq!(config.api_base_url, "http://10.0.0.5:9000");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay_ms, 250);
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_bad_environment_value() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(lookup(&[(ENV_MAX_ATTEMPTS, "many")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidEnvValue {
                var: ENV_MAX_ATTEMPTS,
                value: "many".to_string()
            })
        );
    }

    #[test]
    fn test_validation_failures() {
        let zero_attempts = EngineConfig {
            max_attempts: 0,
            ..EngineConfig::default()
        };
        assert_eq!(zero_attempts.validate(), Err(ConfigError::InvalidMaxAttempts(0)));

        let zero_delay = EngineConfig {
            initial_delay_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(zero_delay.validate(), Err(ConfigError::InvalidInitialDelay));

        let bad_url = EngineConfig {
            api_base_url: "not a url".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(bad_url.validate(), Err(ConfigError::InvalidBaseUrl { .. })));

        let mailto = EngineConfig {
            api_base_url: "mailto:owner@mess.com".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(mailto.validate(), Err(ConfigError::InvalidBaseUrl { .. })));
    }
}
