//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (URL_METADATA_*)
//! 2. TOML config file (if URL_METADATA_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Command line flags are applied on top by the CLI.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

mod validation;

pub use validation::ConfigError;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "URL_METADATA_";

/// Default subtitle language for caption downloads.
pub const DEFAULT_SUBTITLE_LANGUAGE: &str = "en";

/// Default pause between physical network requests, in seconds.
pub const DEFAULT_SLEEP_TIME: u64 = 5;

/// Default log filter.
pub const DEFAULT_LOGLEVEL: &str = "warn";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (URL_METADATA_*)
/// 2. TOML config file (if URL_METADATA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the on-disk cache. Shards live under `<cache_dir>/data`.
    ///
    /// Set via URL_METADATA_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Seconds to wait between physical network requests.
    ///
    /// Set via URL_METADATA_SLEEP_TIME environment variable.
    #[serde(default = "default_sleep_time")]
    pub sleep_time: u64,

    /// Language code for subtitle tracks.
    ///
    /// Set via URL_METADATA_SUBTITLE_LANGUAGE environment variable.
    #[serde(default = "default_subtitle_language")]
    pub subtitle_language: String,

    /// Never download subtitles, even for sites that provide them.
    ///
    /// Set via URL_METADATA_SKIP_SUBTITLES environment variable.
    #[serde(default)]
    pub skip_subtitles: bool,

    /// Log filter directive (e.g. "warn", "debug", "urlmeta_core=trace").
    ///
    /// Set via URL_METADATA_LOGLEVEL environment variable.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per external call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds; doubles per retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "url_metadata")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./url_metadata"))
}

fn default_sleep_time() -> u64 {
    DEFAULT_SLEEP_TIME
}

fn default_subtitle_language() -> String {
    DEFAULT_SUBTITLE_LANGUAGE.into()
}

fn default_loglevel() -> String {
    DEFAULT_LOGLEVEL.into()
}

fn default_user_agent() -> String {
    concat!("url-metadata/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            sleep_time: default_sleep_time(),
            subtitle_language: default_subtitle_language(),
            skip_subtitles: false,
            loglevel: default_loglevel(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum pause between physical network requests.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_time)
    }

    /// Retry policy applied to every collaborator call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            jitter: true,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `URL_METADATA_`
    /// 2. TOML file from `URL_METADATA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(format!("{ENV_PREFIX}CONFIG_FILE")) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
