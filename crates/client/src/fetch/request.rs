//! Intercepted request model.

use serde::{Deserialize, Serialize};

/// Declared destination of a request, as reported by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Font,
    Style,
    Script,
    Manifest,
    #[default]
    Empty,
    Other,
}

/// Request mode, which decides whether the response is inspectable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    /// Cross-origin fetch whose response is opaque.
    NoCors,
}

/// One outgoing request issued by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    pub url: String,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ProxyRequest {
    /// A plain GET with the given destination.
    pub fn get(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            destination,
            mode: RequestMode::Cors,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A top-level document navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url, Destination::Document) }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether this is a safe retrieval.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether this request loads a navigable document.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == Destination::Document
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Vary component of the cache key: `name=value` pairs for each listed
    /// header, lowercased names, in list order.
    pub fn vary_string(&self, vary_headers: &[String]) -> String {
        vary_headers
            .iter()
            .map(|name| format!("{}={}", name.to_lowercase(), self.header(name).unwrap_or("")))
            .collect::<Vec<_>>()
            .join("&")
    }
}
