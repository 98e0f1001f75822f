//! Request classification.
//!
//! Decides whether the proxy intervenes at all and, if so, which partition
//! and strategy apply. Classification never fails: anything it cannot make
//! sense of is passed straight to the network.

use std::sync::LazyLock;

use folio_core::PartitionRole;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::fetch::url::{EXTENSION_SCHEMES, canonicalize, same_origin};
use crate::fetch::{Destination, ProxyRequest};

static FONT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(woff2?|ttf|otf|eot)$").expect("font path pattern is valid"));

/// Fetch-resolution discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Why a request went straight to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// The proxy has not been activated yet.
    NotControlling,
    NonGet,
    ExtensionScheme,
    UnsupportedScheme,
    /// Host is a non-cacheable collaborator (analytics, forms).
    BypassHost,
    BypassPath,
    Unclassifiable,
}

/// Routing decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Bypass(BypassReason),
    Cache {
        role: PartitionRole,
        strategy: Strategy,
        /// Canonical URL used for the cache key.
        url: Url,
    },
}

/// Rules the router classifies against.
#[derive(Debug, Clone)]
pub struct RouterRules {
    pub origin: Url,
    pub bypass_hosts: Vec<String>,
    pub bypass_paths: Vec<String>,
}

impl RouterRules {
    /// Classify a request. First match wins:
    ///
    /// 1. image destination → images, cache-first
    /// 2. font destination or font file extension → fonts, cache-first
    /// 3. serving origin → static, network-first
    /// 4. anything else → runtime, stale-while-revalidate
    pub fn classify(&self, request: &ProxyRequest) -> Route {
        if !request.is_get() {
            return Route::Bypass(BypassReason::NonGet);
        }

        let url = match canonicalize(&request.url) {
            Ok(url) => url,
            Err(_) => return Route::Bypass(self.unroutable(&request.url)),
        };

        if self.is_bypass_host(&url) {
            return Route::Bypass(BypassReason::BypassHost);
        }

        let same_origin = same_origin(&url, &self.origin);
        if same_origin && self.bypass_paths.iter().any(|prefix| url.path().starts_with(prefix.as_str())) {
            return Route::Bypass(BypassReason::BypassPath);
        }

        let (role, strategy) = if request.destination == Destination::Image {
            (PartitionRole::Images, Strategy::CacheFirst)
        } else if request.destination == Destination::Font || FONT_PATH.is_match(url.path()) {
            (PartitionRole::Fonts, Strategy::CacheFirst)
        } else if same_origin {
            (PartitionRole::Static, Strategy::NetworkFirst)
        } else {
            (PartitionRole::Runtime, Strategy::StaleWhileRevalidate)
        };

        Route::Cache { role, strategy, url }
    }

    fn unroutable(&self, raw: &str) -> BypassReason {
        match Url::parse(raw.trim()) {
            Ok(url) if EXTENSION_SCHEMES.contains(&url.scheme()) => BypassReason::ExtensionScheme,
            Ok(_) => BypassReason::UnsupportedScheme,
            Err(_) => BypassReason::Unclassifiable,
        }
    }

    fn is_bypass_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.bypass_hosts.iter().any(|bypass| {
            let bypass = bypass.to_lowercase();
            host == bypass || host.ends_with(&format!(".{bypass}"))
        })
    }
}
