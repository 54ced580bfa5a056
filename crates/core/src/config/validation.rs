//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::policy::CachePolicy;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn require_http(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(field, format!("{value}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field, format!("unsupported scheme: {scheme}"))),
    }
}

fn check_policy(field: &str, policy: &CachePolicy) -> Result<(), ConfigError> {
    if policy.max_age_ms <= 0 {
        return Err(invalid(field, "max_age_ms must be greater than 0"));
    }
    if policy.max_entries == 0 {
        return Err(invalid(field, "max_entries must be greater than 0"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` is empty or contains whitespace
    /// - `origin`, `weather_api_base` or an API prefix is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - a policy has a zero max age or zero max entries
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.is_empty() || self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must be a non-empty tag without whitespace"));
        }

        require_http("origin", &self.origin)?;
        require_http("weather_api_base", &self.weather_api_base)?;
        if self.api_prefixes.is_empty() {
            return Err(invalid("api_prefixes", "at least one prefix is required"));
        }
        for prefix in &self.api_prefixes {
            require_http("api_prefixes", prefix)?;
        }
        self.app_shell_urls()?;

        if self.default_city.trim().is_empty() {
            return Err(invalid("default_city", "must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        check_policy("policies.static_assets", &self.policies.static_assets)?;
        check_policy("policies.api", &self.policies.api)?;
        check_policy("policies.images", &self.policies.images)?;

        if self.weather_api_key.is_none() {
            tracing::warn!("weather_api_key is not set; install pre-warm and background refresh are disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Strategy;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_non_http_origin() {
        let config = AppConfig { origin: "file:///srv/app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_bad_prefix() {
        let config = AppConfig { api_prefixes: vec!["not a url".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_prefixes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let low = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(low.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let high = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(high.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let edge = AppConfig { timeout_ms: 100, max_bytes: 1, ..Default::default() };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_policy() {
        let mut config = AppConfig::default();
        config.policies.images = CachePolicy::new(Strategy::CacheFirst, 0, 10);
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "policies.images"));

        config.policies.images = CachePolicy::new(Strategy::CacheFirst, 1_000, 0);
        assert!(config.validate().is_err());
    }
}
