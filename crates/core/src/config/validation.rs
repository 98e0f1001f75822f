//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `max_age_days` is 0 or exceeds a year
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_prefix` is empty
    /// - `version` is set but empty or contains whitespace
    /// - `install_concurrency` is outside 1..=32
    ///
    /// Returns `ConfigError::Missing` if no shell URL is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.max_age_days == 0 {
            return Err(ConfigError::Invalid { field: "max_age_days".into(), reason: "must be greater than 0".into() });
        }
        if self.max_age_days > 365 {
            return Err(ConfigError::Invalid { field: "max_age_days".into(), reason: "must not exceed 365".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }

        if let Some(version) = &self.version
            && (version.is_empty() || version.chars().any(char::is_whitespace))
        {
            return Err(ConfigError::Invalid {
                field: "version".into(),
                reason: "must be non-empty and contain no whitespace".into(),
            });
        }

        if self.shell_urls.is_empty() {
            return Err(ConfigError::Missing {
                field: "shell_urls".into(),
                hint: "Offline navigations need at least one shell document, e.g. \"/\"".into(),
            });
        }

        if self.install_concurrency == 0 || self.install_concurrency > 32 {
            return Err(ConfigError::Invalid {
                field: "install_concurrency".into(),
                reason: "must be between 1 and 32".into(),
            });
        }

        for shell in &self.shell_urls {
            if !self.precache.iter().any(|entry| entry == shell) {
                tracing::warn!(
                    shell_url = %shell,
                    "Shell document is not in the install manifest; offline navigations \
                     depend on it being cached by a later visit"
                );
            }
        }

        Ok(())
    }
}
