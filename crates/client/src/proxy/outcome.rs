//! Tagged result of a handled request.

use folio_core::{CachedResponse, Error};
use serde::Serialize;

/// Which fallback produced a response after the network failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// An expired cache-first entry.
    StaleEntry,
    /// The last-known-good network-first entry for the same key.
    CachedEntry,
    /// The reserved shell document, for navigations never cached.
    ShellDocument,
}

/// How a request was resolved.
#[derive(Debug)]
pub enum Outcome {
    ServedFromCache(CachedResponse),
    ServedFromNetwork(CachedResponse),
    ServedFromFallback { response: CachedResponse, kind: FallbackKind },
    Failed(Error),
}

impl Outcome {
    /// Stable snake_case tag for logs and tool replies.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::ServedFromCache(_) => "served_from_cache",
            Outcome::ServedFromNetwork(_) => "served_from_network",
            Outcome::ServedFromFallback { .. } => "served_from_fallback",
            Outcome::Failed(_) => "failed",
        }
    }

    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Outcome::ServedFromCache(response)
            | Outcome::ServedFromNetwork(response)
            | Outcome::ServedFromFallback { response, .. } => Some(response),
            Outcome::Failed(_) => None,
        }
    }

    pub fn fallback_kind(&self) -> Option<FallbackKind> {
        match self {
            Outcome::ServedFromFallback { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The response handed to the page, or the failure it observes.
    pub fn into_result(self) -> Result<CachedResponse, Error> {
        match self {
            Outcome::ServedFromCache(response)
            | Outcome::ServedFromNetwork(response)
            | Outcome::ServedFromFallback { response, .. } => Ok(response),
            Outcome::Failed(err) => Err(err),
        }
    }
}
