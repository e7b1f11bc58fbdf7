//! Configuration loading
//!
//! Settings are layered, lowest priority first:
//! 1. Built-in defaults (unbounded cache, no expiry, no invocation timeout)
//! 2. Config file: `--config` / `SNIPPET_CONFIG_PATH`, else `./snippet.toml` if present
//! 3. Environment variables: `SNIPPET_CACHE__MAX_ENTRIES`, `SNIPPET_RUNNER__TIMEOUT_MS`, ...
//!
//! A `.env` file in the working directory is loaded into the environment first.
//!
//! ```toml
//! [cache]
//! max_entries = 1024
//! time_to_live_secs = 600
//! eviction = "lru"
//!
//! [runner]
//! timeout_ms = 250
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "SNIPPET";
const CONFIG_PATH_VAR: &str = "SNIPPET_CONFIG_PATH";
const DEFAULT_CONFIG_NAME: &str = "snippet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which entry a bounded cache drops first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    Lru,
    Fifo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached runners (unbounded when absent)
    pub max_entries: Option<usize>,

    /// Seconds after compilation before an entry must be recompiled
    pub time_to_live_secs: Option<u64>,

    pub eviction: EvictionKind,
}

impl CacheConfig {
    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on a single invocation, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl RunnerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        Self::load_from(path.as_deref())
    }

    /// Load configuration from an explicit file (or the default search) plus the environment
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ::config::File::with_name(path),
            None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: Config = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than 0".to_string(),
            ));
        }
        if self.cache.time_to_live_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.time_to_live_secs must be greater than 0".to_string(),
            ));
        }
        if self.runner.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "runner.timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = Config::default();
        assert_eq!(config.cache.max_entries, None);
        assert_eq!(config.cache.time_to_live(), None);
        assert_eq!(config.cache.eviction, EvictionKind::Lru);
        assert_eq!(config.runner.timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [cache]
            max_entries = 64
            time_to_live_secs = 600
            eviction = "fifo"

            [runner]
            timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.max_entries, Some(64));
        assert_eq!(config.cache.time_to_live(), Some(Duration::from_secs(600)));
        assert_eq!(config.cache.eviction, EvictionKind::Fifo);
        assert_eq!(config.runner.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("[runner]\ntimeout_ms = 10\n").unwrap();
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.runner.timeout_ms, Some(10));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = Config::from_toml_str("[cache]\nmax_entries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::from_toml_str("[runner]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_eviction() {
        let err = Config::from_toml_str("[cache]\neviction = \"random\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_missing_explicit_file_fails() {
        let err = Config::load_from(Some("definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
