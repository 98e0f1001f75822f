//! Fetch-resolution strategies.
//!
//! Each strategy resolves one request against one partition and reports a
//! tagged [`Outcome`](super::Outcome). Storage problems never fail a request
//! on their own: a failed read is a miss and a failed write is logged while
//! the network response is still served.

pub mod cache_first;
pub mod network_first;
pub mod stale_while_revalidate;

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;
pub use stale_while_revalidate::StaleWhileRevalidate;

use std::sync::Arc;

use folio_core::{CacheDb, CacheKey, CachedResponse};

use super::events::EventBus;
use crate::fetch::Fetcher;

/// Shared handles every strategy works with.
#[derive(Clone)]
pub struct StrategyContext {
    pub db: CacheDb,
    pub fetcher: Arc<dyn Fetcher>,
    pub events: EventBus,
}

/// Read an entry, treating storage errors as a miss.
pub(crate) async fn lookup(ctx: &StrategyContext, partition: &str, key: &CacheKey) -> Option<CachedResponse> {
    match ctx.db.match_entry(partition, key).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(partition, error = %e, "cache read failed; treating as miss");
            None
        }
    }
}

/// Write an entry, logging storage errors. Returns whether it was stored.
pub(crate) async fn store(ctx: &StrategyContext, partition: &str, key: &CacheKey, response: &CachedResponse) -> bool {
    match ctx.db.put_entry(partition, key, response).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(partition, url = %response.url, error = %e, "cache write failed");
            false
        }
    }
}
