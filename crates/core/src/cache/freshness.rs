//! Freshness ledger for cache-first partitions.
//!
//! Timestamps live in the parallel `-meta` partition as ordinary entries whose
//! body is the store time in epoch milliseconds. Recording an entry and its
//! timestamp are two independent writes. A missing or unreadable timestamp
//! reads as `None`, which callers treat as expired.

use chrono::{DateTime, TimeZone, Utc};

use super::connection::CacheDb;
use super::entries::CachedResponse;
use super::hash::CacheKey;
use crate::Error;

impl CacheDb {
    /// Record that the entry under `key` was refreshed at `at`.
    pub async fn record_fetched_at(
        &self, meta_partition: &str, key: &CacheKey, url: &str, at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let stamp = CachedResponse {
            url: url.to_string(),
            status: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: at.timestamp_millis().to_string().into_bytes(),
            opaque: false,
        };
        self.put_entry(meta_partition, key, &stamp).await
    }

    /// When the entry under `key` was last refreshed, if known.
    pub async fn fetched_at(&self, meta_partition: &str, key: &CacheKey) -> Result<Option<DateTime<Utc>>, Error> {
        let Some(stamp) = self.match_entry(meta_partition, key).await? else {
            return Ok(None);
        };

        let parsed = stamp
            .text()
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        if parsed.is_none() {
            tracing::warn!(partition = meta_partition, url = %stamp.url, "unreadable freshness timestamp");
        }

        Ok(parsed)
    }
}

/// Whether a timestamp is still inside the freshness window at `now`.
pub fn is_within(fetched_at: DateTime<Utc>, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(fetched_at) <= max_age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/a.png");
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap();

        db.record_fetched_at("images-meta", &key, "https://example.com/a.png", at)
            .await
            .unwrap();

        assert_eq!(db.fetched_at("images-meta", &key).await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn test_missing_timestamp() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/a.png");
        assert_eq!(db.fetched_at("images-meta", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_timestamp_reads_as_none() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/a.png");
        let garbage = CachedResponse {
            url: "https://example.com/a.png".into(),
            status: 200,
            headers: Vec::new(),
            body: b"yesterday".to_vec(),
            opaque: false,
        };
        db.put_entry("images-meta", &key, &garbage).await.unwrap();

        assert_eq!(db.fetched_at("images-meta", &key).await.unwrap(), None);
    }

    #[test]
    fn test_is_within() {
        let now = Utc::now();
        let max_age = chrono::Duration::days(30);
        assert!(is_within(now - chrono::Duration::days(29), max_age, now));
        assert!(is_within(now - max_age, max_age, now));
        assert!(!is_within(now - chrono::Duration::days(31), max_age, now));
    }
}
