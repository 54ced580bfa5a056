//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STRATUS_*)
//! 2. TOML config file (if STRATUS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::policy::{CacheSettings, Generation, PolicyTable};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STRATUS_*, `__` separates nested keys)
/// 2. TOML config file (if STRATUS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite bucket store.
    ///
    /// Set via STRATUS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Generation tag baked into every bucket name. Bumping it retires
    /// every bucket of the previous generation on the next activate.
    ///
    /// Set via STRATUS_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the app the orchestrator serves.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// App-shell paths pre-cached on install, resolved against `origin`.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// URL prefixes classified into the `api` bucket.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Base URL of the weather provider's current/forecast endpoints.
    #[serde(default = "default_weather_api_base")]
    pub weather_api_base: String,

    /// Weather provider API key. Without it the install-time pre-warm and
    /// background refresh are skipped.
    ///
    /// Set via STRATUS_WEATHER_API_KEY environment variable.
    #[serde(default)]
    pub weather_api_key: Option<String>,

    /// City pre-warmed on install.
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default = "default_units")]
    pub units: String,

    #[serde(default = "default_lang")]
    pub lang: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Seconds between periodic eviction sweeps. 0 disables the timer.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Per-bucket strategy, max age and max entries.
    #[serde(default)]
    pub policies: PolicyTable,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stratus-cache.sqlite")
}

fn default_cache_version() -> String {
    "v10.0.0".into()
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_app_shell() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/vite.svg"].into_iter().map(String::from).collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["https://api.openweathermap.org/data/2.5/".into(), "https://api.openweathermap.org/data/3.0/".into()]
}

fn default_weather_api_base() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}

fn default_city() -> String {
    "Milano".into()
}

fn default_units() -> String {
    "metric".into()
}

fn default_lang() -> String {
    "it".into()
}

fn default_user_agent() -> String {
    "stratus-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_sweep_interval_secs() -> u64 {
    3_600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            app_shell: default_app_shell(),
            api_prefixes: default_api_prefixes(),
            weather_api_base: default_weather_api_base(),
            weather_api_key: None,
            default_city: default_city(),
            units: default_units(),
            lang: default_lang(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            sweep_interval_secs: default_sweep_interval_secs(),
            policies: PolicyTable::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sweep period, or None when periodic sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STRATUS_`
    /// 2. TOML file from `STRATUS_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("STRATUS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STRATUS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// App-shell URLs resolved against the origin.
    pub fn app_shell_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let origin = self.origin_url()?;
        self.app_shell
            .iter()
            .map(|path| {
                origin.join(path).map_err(|e| ConfigError::Invalid {
                    field: "app_shell".into(),
                    reason: format!("{path}: {e}"),
                })
            })
            .collect()
    }

    /// Build the immutable settings object shared by the orchestrator.
    pub fn cache_settings(&self) -> Result<CacheSettings, ConfigError> {
        Ok(CacheSettings {
            generation: Generation::new(self.cache_version.clone()),
            policies: self.policies,
            api_prefixes: self.api_prefixes.clone(),
            origin: self.origin_url()?,
        })
    }
}
