//! Normalized cache key generation.

use std::fmt;

use sha2::{Digest, Sha256};

/// Hashed request identifier used as the key inside a partition.
///
/// Built from the canonical URL and the values of any configured vary
/// headers, so two requests differing only in those headers get distinct
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a canonical URL with no vary headers.
    pub fn for_url(url: &str) -> Self {
        Self::new(url, "")
    }

    pub fn new(url: &str, vary_headers: &str) -> Self {
        Self(compute_cache_key(url, vary_headers))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the hex SHA-256 key for a request identifier.
pub fn compute_cache_key(url: &str, vary_headers: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_headers.as_bytes());
    hex::encode(hasher.finalize())
}
