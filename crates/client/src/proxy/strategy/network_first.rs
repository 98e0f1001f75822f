//! Network-first: the network wins whenever it answers.
//!
//! Used for the application shell and same-origin assets. Offline, the last
//! good entry is served, and navigations that were never cached fall back to
//! the shell document.
//!
//! Only a 200 replaces a stored entry. Everything routed here is same-origin,
//! so an opaque flag never makes an error page cacheable.

use folio_core::CacheKey;

use super::{StrategyContext, lookup, store};
use crate::fetch::ProxyRequest;
use crate::proxy::outcome::{FallbackKind, Outcome};

#[derive(Debug, Clone)]
pub struct NetworkFirst {
    pub partition: String,
    /// Keys of the shell document candidates, tried in order.
    pub shell_keys: Vec<CacheKey>,
}

impl NetworkFirst {
    pub async fn respond(&self, ctx: &StrategyContext, request: &ProxyRequest, key: &CacheKey) -> Outcome {
        let err = match ctx.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    store(ctx, &self.partition, key, &response).await;
                }
                return Outcome::ServedFromNetwork(response);
            }
            Err(err) => err,
        };

        if let Some(entry) = lookup(ctx, &self.partition, key).await {
            tracing::debug!(url = %request.url, error = %err, "network failed; serving cached entry");
            return Outcome::ServedFromFallback { response: entry, kind: FallbackKind::CachedEntry };
        }

        if request.is_navigation() {
            for shell_key in &self.shell_keys {
                if let Some(shell) = lookup(ctx, &self.partition, shell_key).await {
                    tracing::debug!(url = %request.url, shell = %shell.url, "network failed; serving shell");
                    return Outcome::ServedFromFallback { response: shell, kind: FallbackKind::ShellDocument };
                }
            }
        }

        Outcome::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Destination, RequestMode};
    use crate::testing::{ScriptedFetcher, context, ok_response};

    const ROOT: &str = "https://jdoe.example.edu/";
    const PAGE: &str = "https://jdoe.example.edu/publications";
    const PARTITION: &str = "folio-static-v1";

    fn strategy() -> NetworkFirst {
        NetworkFirst { partition: PARTITION.into(), shell_keys: vec![CacheKey::for_url(ROOT)] }
    }

    #[tokio::test]
    async fn test_network_overrides_stale_cache() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(PAGE, 200, "fresh");
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(PAGE);
        ctx.db.put_entry(PARTITION, &key, &ok_response(PAGE, "stale")).await.unwrap();

        let outcome = strategy().respond(&ctx, &ProxyRequest::navigate(PAGE), &key).await;

        assert!(matches!(&outcome, Outcome::ServedFromNetwork(r) if r.text() == "fresh"));
        let stored = ctx.db.match_entry(PARTITION, &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "fresh");
    }

    #[tokio::test]
    async fn test_offline_serves_cached_entry() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(PAGE);
        ctx.db.put_entry(PARTITION, &key, &ok_response(PAGE, "last good")).await.unwrap();

        let outcome = strategy().respond(&ctx, &ProxyRequest::navigate(PAGE), &key).await;

        assert_eq!(outcome.fallback_kind(), Some(FallbackKind::CachedEntry));
        assert_eq!(outcome.response().unwrap().text(), "last good");
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_shell() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone()).await;
        ctx.db
            .put_entry(PARTITION, &CacheKey::for_url(ROOT), &ok_response(ROOT, "<html>shell</html>"))
            .await
            .unwrap();

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::navigate(PAGE), &CacheKey::for_url(PAGE))
            .await;

        assert_eq!(outcome.fallback_kind(), Some(FallbackKind::ShellDocument));
        assert_eq!(outcome.response().unwrap().text(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_subresource_does_not_get_shell() {
        let fetcher = ScriptedFetcher::new();
        let ctx = context(fetcher.clone()).await;
        ctx.db
            .put_entry(PARTITION, &CacheKey::for_url(ROOT), &ok_response(ROOT, "<html>shell</html>"))
            .await
            .unwrap();
        let url = "https://jdoe.example.edu/js/main.js";

        let outcome = strategy()
            .respond(&ctx, &ProxyRequest::get(url, Destination::Script), &CacheKey::for_url(url))
            .await;

        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_served_without_overwriting() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(PAGE, 503, "maintenance");
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(PAGE);
        ctx.db.put_entry(PARTITION, &key, &ok_response(PAGE, "good")).await.unwrap();

        let outcome = strategy().respond(&ctx, &ProxyRequest::navigate(PAGE), &key).await;

        assert!(matches!(&outcome, Outcome::ServedFromNetwork(r) if r.status == 503));
        let stored = ctx.db.match_entry(PARTITION, &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "good");
    }

    #[tokio::test]
    async fn test_no_cors_error_page_keeps_last_good_entry() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(PAGE, 503, "maintenance");
        let ctx = context(fetcher.clone()).await;
        let key = CacheKey::for_url(PAGE);
        ctx.db.put_entry(PARTITION, &key, &ok_response(PAGE, "good")).await.unwrap();
        let request = ProxyRequest::get(PAGE, Destination::Document).with_mode(RequestMode::NoCors);

        let outcome = strategy().respond(&ctx, &request, &key).await;

        assert!(matches!(&outcome, Outcome::ServedFromNetwork(r) if r.status == 503 && r.opaque));
        let stored = ctx.db.match_entry(PARTITION, &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "good");
        assert_eq!(stored.status, 200);
    }
}
