//! Cache-first: serve a fresh entry without touching the network.
//!
//! Used for images and fonts. Freshness comes from the meta partition; an
//! entry with no readable timestamp is treated as expired so an interrupted
//! entry/timestamp write can only cause an extra fetch, never a stale hit.

use chrono::Utc;
use folio_core::cache::freshness::is_within;
use folio_core::{CacheKey, CachedResponse};

use super::{StrategyContext, lookup, store};
use crate::fetch::ProxyRequest;
use crate::proxy::outcome::{FallbackKind, Outcome};

#[derive(Debug, Clone)]
pub struct CacheFirst {
    pub partition: String,
    pub meta_partition: String,
    pub max_age: chrono::Duration,
}

impl CacheFirst {
    pub async fn respond(&self, ctx: &StrategyContext, request: &ProxyRequest, key: &CacheKey) -> Outcome {
        let cached = lookup(ctx, &self.partition, key).await;

        if let Some(entry) = cached {
            if self.is_fresh(ctx, key).await {
                tracing::debug!(url = %request.url, "cache-first hit");
                return Outcome::ServedFromCache(entry);
            }
            tracing::debug!(url = %request.url, "cache-first entry expired");
            return self.refetch(ctx, request, key, Some(entry)).await;
        }

        tracing::debug!(url = %request.url, "cache-first miss");
        self.refetch(ctx, request, key, None).await
    }

    async fn is_fresh(&self, ctx: &StrategyContext, key: &CacheKey) -> bool {
        match ctx.db.fetched_at(&self.meta_partition, key).await {
            Ok(Some(at)) => is_within(at, self.max_age, Utc::now()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(partition = %self.meta_partition, error = %e, "freshness read failed");
                false
            }
        }
    }

    async fn refetch(
        &self, ctx: &StrategyContext, request: &ProxyRequest, key: &CacheKey, stale: Option<CachedResponse>,
    ) -> Outcome {
        match ctx.fetcher.fetch(request).await {
            Ok(response) => {
                // Timestamp only follows a successful entry write.
                if response.is_cacheable() && store(ctx, &self.partition, key, &response).await {
                    if let Err(e) = ctx
                        .db
                        .record_fetched_at(&self.meta_partition, key, &response.url, Utc::now())
                        .await
                    {
                        tracing::warn!(url = %response.url, error = %e, "freshness write failed");
                    }
                }
                Outcome::ServedFromNetwork(response)
            }
            Err(err) => match stale {
                Some(entry) => {
                    tracing::debug!(url = %request.url, error = %err, "network failed; serving expired entry");
                    Outcome::ServedFromFallback { response: entry, kind: FallbackKind::StaleEntry }
                }
                None => Outcome::Failed(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Destination;
    use crate::testing::{ScriptedFetcher, context, ok_response};

    const URL: &str = "https://jdoe.example.edu/images/profile.webp";

    fn strategy() -> CacheFirst {
        CacheFirst {
            partition: "folio-images-v1".into(),
            meta_partition: "folio-images-v1-meta".into(),
            max_age: chrono::Duration::days(30),
        }
    }

    async fn seed(ctx: &StrategyContext, body: &str, age: chrono::Duration) -> CacheKey {
        let key = CacheKey::for_url(URL);
        ctx.db.put_entry("folio-images-v1", &key, &ok_response(URL, body)).await.unwrap();
        ctx.db
            .record_fetched_at("folio-images-v1-meta", &key, URL, Utc::now() - age)
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_network() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(URL, 200, "network");
        let ctx = context(fetcher.clone()).await;
        let key = seed(&ctx, "cached", chrono::Duration::days(1)).await;

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &key)
            .await;

        assert!(matches!(&outcome, Outcome::ServedFromCache(r) if r.text() == "cached"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches_once_and_restamps() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(URL, 200, "network");
        let ctx = context(fetcher.clone()).await;
        let key = seed(&ctx, "cached", chrono::Duration::days(31)).await;
        let before = ctx.db.fetched_at("folio-images-v1-meta", &key).await.unwrap().unwrap();

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &key)
            .await;

        assert!(matches!(&outcome, Outcome::ServedFromNetwork(r) if r.text() == "network"));
        assert_eq!(fetcher.calls(), 1);
        let after = ctx.db.fetched_at("folio-images-v1-meta", &key).await.unwrap().unwrap();
        assert!(after > before);
        let stored = ctx.db.match_entry("folio-images-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "network");
    }

    #[tokio::test]
    async fn test_missing_timestamp_counts_as_expired() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(URL, 200, "network");
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(URL);
        ctx.db
            .put_entry("folio-images-v1", &key, &ok_response(URL, "cached"))
            .await
            .unwrap();

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &key)
            .await;

        assert_eq!(outcome.tag(), "served_from_network");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_serves_expired_entry() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone()).await;
        let key = seed(&ctx, "cached", chrono::Duration::days(90)).await;

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &key)
            .await;

        assert_eq!(outcome.fallback_kind(), Some(FallbackKind::StaleEntry));
        assert_eq!(outcome.response().unwrap().text(), "cached");
    }

    #[tokio::test]
    async fn test_offline_without_entry_fails() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone()).await;

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &CacheKey::for_url(URL))
            .await;

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.is_network()));
    }

    #[tokio::test]
    async fn test_non_200_is_served_but_not_stored() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(URL, 404, "missing");
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(URL);

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(URL, Destination::Image), &key)
            .await;

        assert!(matches!(&outcome, Outcome::ServedFromNetwork(r) if r.status == 404));
        assert!(ctx.db.match_entry("folio-images-v1", &key).await.unwrap().is_none());
        assert!(ctx.db.fetched_at("folio-images-v1-meta", &key).await.unwrap().is_none());
    }
}
