//! Stale-while-revalidate: answer from cache, refresh behind the caller.
//!
//! Used for cross-origin resources. The network fetch starts before the
//! cache lookup finishes and runs as its own task, so a cached answer never
//! waits on it. Concurrent revalidations of one key race; last write wins.

use folio_core::{CacheKey, CachedResponse, Error};

use super::{StrategyContext, lookup, store};
use crate::fetch::ProxyRequest;
use crate::proxy::events::WorkerEvent;
use crate::proxy::outcome::Outcome;

#[derive(Debug, Clone)]
pub struct StaleWhileRevalidate {
    pub partition: String,
}

impl StaleWhileRevalidate {
    pub async fn respond(&self, ctx: &StrategyContext, request: &ProxyRequest, key: &CacheKey) -> Outcome {
        let revalidation =
            tokio::spawn(revalidate(ctx.clone(), self.partition.clone(), key.clone(), request.clone()));

        if let Some(entry) = lookup(ctx, &self.partition, key).await {
            tracing::debug!(url = %request.url, "serving cached entry; revalidating in background");
            return Outcome::ServedFromCache(entry);
        }

        match revalidation.await {
            Ok(Ok(response)) => Outcome::ServedFromNetwork(response),
            Ok(Err(err)) => Outcome::Failed(err),
            Err(join_err) => Outcome::Failed(Error::Network(format!("revalidation task failed: {join_err}"))),
        }
    }
}

async fn revalidate(
    ctx: StrategyContext, partition: String, key: CacheKey, request: ProxyRequest,
) -> Result<CachedResponse, Error> {
    let response = match ctx.fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "revalidation fetch failed");
            return Err(err);
        }
    };

    if response.is_cacheable() && store(&ctx, &partition, &key, &response).await {
        ctx.events
            .emit(WorkerEvent::Revalidated { url: response.url.clone(), partition });
    }

    Ok(response)
}
