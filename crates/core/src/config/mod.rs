//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_*)
//! 2. TOML config file (if FOLIO_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::epoch::Epoch;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_*)
/// 2. TOML config file (if FOLIO_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every cache partition.
    ///
    /// Set via FOLIO_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Serving origin of the site, e.g. `https://jdoe.example.edu`.
    ///
    /// Requests to this origin are treated as the application shell.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version epoch token embedded in every partition name.
    ///
    /// Falls back to the build-time token, then to the current timestamp.
    #[serde(default)]
    pub version: Option<String>,

    /// Prefix shared by every partition this proxy creates.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Title used for push notifications that carry none.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Freshness window for image and font partitions, in days.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// User-Agent string for outgoing requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to capture per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Install manifest: assets essential to first render.
    ///
    /// Relative entries resolve against `origin`.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Cross-origin assets pre-warmed into the runtime partition (no-cors).
    #[serde(default = "default_runtime_precache")]
    pub runtime_precache: Vec<String>,

    /// Candidate shell documents served to offline navigations, in order.
    #[serde(default = "default_shell_urls")]
    pub shell_urls: Vec<String>,

    /// Hosts never intercepted (analytics beacons, form endpoints).
    #[serde(default = "default_bypass_hosts")]
    pub bypass_hosts: Vec<String>,

    /// Same-origin path prefixes never intercepted.
    #[serde(default = "default_bypass_paths")]
    pub bypass_paths: Vec<String>,

    /// Request headers folded into cache keys.
    #[serde(default)]
    pub vary_headers: Vec<String>,

    /// Maximum concurrent fetches while populating partitions at install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./folio-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "folio".into()
}

fn default_site_name() -> String {
    "Academic Portfolio".into()
}

fn default_max_age_days() -> u32 {
    30
}

fn default_user_agent() -> String {
    "folio-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/styles.css",
        "/js/main.js",
        "/images/profile.webp",
        "/images/profile.jpg",
        "/data/content.json",
        "/files/cv.pdf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_runtime_precache() -> Vec<String> {
    vec![
        "https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&display=swap".into(),
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css".into(),
    ]
}

fn default_shell_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_bypass_hosts() -> Vec<String> {
    [
        "www.google-analytics.com",
        "analytics.google.com",
        "www.googletagmanager.com",
        "formspree.io",
        "api.github.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_bypass_paths() -> Vec<String> {
    vec!["/api/".into(), "/admin".into()]
}

fn default_install_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            version: None,
            cache_prefix: default_cache_prefix(),
            site_name: default_site_name(),
            max_age_days: default_max_age_days(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            precache: default_precache(),
            runtime_precache: default_runtime_precache(),
            shell_urls: default_shell_urls(),
            bypass_hosts: default_bypass_hosts(),
            bypass_paths: default_bypass_paths(),
            vary_headers: Vec::new(),
            install_concurrency: default_install_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Freshness window for cache-first partitions.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_age_days))
    }

    /// Resolve the version epoch for this run.
    pub fn epoch(&self) -> Epoch {
        Epoch::resolve(self.version.as_deref())
    }

    /// Parse the serving origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
            _ => Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) origin".into() }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_`
    /// 2. TOML file from `FOLIO_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("FOLIO_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FOLIO_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
