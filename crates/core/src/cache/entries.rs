//! Cache entry operations.
//!
//! Entries are never mutated partially: a put replaces the whole captured
//! response stored under a key.

use std::borrow::Cow;

use super::connection::CacheDb;
use super::hash::CacheKey;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A complete captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Captured from a no-cors cross-origin fetch. The status of an opaque
    /// response is never inspected.
    pub opaque: bool,
}

impl CachedResponse {
    /// Whether a strategy may store this response.
    ///
    /// Opaque responses are cacheable as-is; everything else needs a 200.
    pub fn is_cacheable(&self) -> bool {
        self.opaque || self.status == 200
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Listing row for one stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub key: String,
    pub url: String,
    pub status: u16,
    pub opaque: bool,
    pub size: i64,
    pub stored_at: String,
}

impl CacheDb {
    /// Store a response under `key`, replacing any previous entry.
    ///
    /// The partition is created if it does not exist yet.
    pub async fn put_entry(&self, partition: &str, key: &CacheKey, response: &CachedResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        let response = response.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (partition, key, url, status, headers_json, body, opaque, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(partition, key) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        opaque = excluded.opaque,
                        stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key,
                        &response.url,
                        response.status,
                        &headers_json,
                        &response.body,
                        response.opaque as i32,
                        &now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry stored under `key`.
    ///
    /// Returns None if the partition or the key doesn't exist.
    pub async fn match_entry(&self, partition: &str, key: &CacheKey) -> Result<Option<CachedResponse>, Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, opaque
                     FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i32>(4)? == 1,
                    ))
                });

                match result {
                    Ok((url, status, headers_json, body, opaque)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
                        Ok(Some(CachedResponse { url, status, headers, body, opaque }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry stored under `key`.
    ///
    /// Returns false if nothing was stored.
    pub async fn delete_entry(&self, partition: &str, key: &CacheKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND key = ?2", params![partition, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry captured for `url`, whatever its vary values.
    pub async fn delete_entries_by_url(&self, partition: &str, url: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND url = ?2", params![partition, url])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a partition, ordered by URL.
    pub async fn list_entries(&self, partition: &str) -> Result<Vec<EntrySummary>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, url, status, opaque, length(body), stored_at
                     FROM entries WHERE partition = ?1 ORDER BY url",
                )?;
                let rows = stmt
                    .query_map(params![partition], |row| {
                        Ok(EntrySummary {
                            key: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            opaque: row.get::<_, i32>(3)? == 1,
                            size: row.get(4)?,
                            stored_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(url: &str, body: &str) -> CachedResponse {
        CachedResponse {
            url: url.to_string(),
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
            opaque: false,
        }
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/");
        let response = make_response("https://example.com/", "<h1>home</h1>");

        db.put_entry("folio-static-v1", &key, &response).await.unwrap();

        let stored = db.match_entry("folio-static-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored, response);
        assert_eq!(stored.header("Content-Type"), Some("text/html"));
        assert!(db.has_partition("folio-static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_replaces_wholesale() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/");

        db.put_entry("p", &key, &make_response("https://example.com/", "old"))
            .await
            .unwrap();
        let replacement = CachedResponse { headers: Vec::new(), ..make_response("https://example.com/", "new") };
        db.put_entry("p", &key, &replacement).await.unwrap();

        let stored = db.match_entry("p", &key).await.unwrap().unwrap();
        assert_eq!(stored.text(), "new");
        assert!(stored.headers.is_empty());
        assert_eq!(db.list_entries("p").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/");
        db.put_entry("a", &key, &make_response("https://example.com/", "x"))
            .await
            .unwrap();

        assert!(db.match_entry("b", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_partition_drops_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/");
        db.put_entry("a", &key, &make_response("https://example.com/", "x"))
            .await
            .unwrap();

        db.delete_partition("a").await.unwrap();
        assert!(db.match_entry("a", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = CacheKey::for_url("https://example.com/");
        db.put_entry("a", &key, &make_response("https://example.com/", "x"))
            .await
            .unwrap();

        assert!(db.delete_entry("a", &key).await.unwrap());
        assert!(!db.delete_entry("a", &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_entries_by_url_covers_vary_variants() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://example.com/";
        db.put_entry("a", &CacheKey::new(url, "accept-language=en"), &make_response(url, "en"))
            .await
            .unwrap();
        db.put_entry("a", &CacheKey::new(url, "accept-language=de"), &make_response(url, "de"))
            .await
            .unwrap();
        db.put_entry("a", &CacheKey::for_url("https://example.com/cv.pdf"), &make_response("https://example.com/cv.pdf", "%PDF"))
            .await
            .unwrap();

        assert_eq!(db.delete_entries_by_url("a", url).await.unwrap(), 2);
        assert_eq!(db.list_entries("a").await.unwrap().len(), 1);
    }

    #[test]
    fn test_is_cacheable() {
        let ok = make_response("https://example.com/", "");
        assert!(ok.is_cacheable());

        let not_found = CachedResponse { status: 404, ..ok.clone() };
        assert!(!not_found.is_cacheable());

        let opaque = CachedResponse { status: 0, opaque: true, ..ok };
        assert!(opaque.is_cacheable());
    }
}
