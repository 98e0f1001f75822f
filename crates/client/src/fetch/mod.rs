//! HTTP fetch pipeline behind the caching proxy.
//!
//! ### Network Side
//! - `Fetcher` is the seam between strategies and the network; strategies
//!   never talk to reqwest directly.
//! - Any completed HTTP exchange is `Ok`, whatever its status. Only transport
//!   failures (DNS, connect, reset, timeout, oversize body) are errors.
//! - `no-cors` requests to another origin produce opaque captures.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//! - Request timeout: 20s (configurable)

pub mod request;
pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use self::request::{Destination, ProxyRequest, RequestMode};
pub use self::url::{UrlError, canonicalize};

use self::url::same_origin;

use folio_core::{AppConfig, CachedResponse, Error};

/// Network access used by the caching strategies.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request against the network.
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "folio-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Site origin; `no-cors` captures from it stay inspectable (default: none)
    pub origin: Option<::url::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "folio-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: None,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin: config.origin_url().ok(),
            ..Default::default()
        }
    }
}

/// reqwest-backed fetcher.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Whether a capture of `url` made with `mode` hides its status and body.
    fn is_opaque(&self, url: &::url::Url, mode: RequestMode) -> bool {
        mode == RequestMode::NoCors && !self.config.origin.as_ref().is_some_and(|origin| same_origin(origin, url))
    }

    fn transport_error(url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{url}: {err}"))
        } else {
            Error::Network(format!("{url}: {err}"))
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::transport_error(url.as_str(), e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| **name != header::SET_COOKIE)
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(url.as_str(), e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(CachedResponse {
            opaque: self.is_opaque(&url, request.mode),
            url: url.to_string(),
            status: status.as_u16(),
            headers,
            body: bytes.to_vec(),
        })
    }
}
