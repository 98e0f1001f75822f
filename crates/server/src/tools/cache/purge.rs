//! cache_purge tool implementation.
//!
//! Purges one partition, or the entries of one URL inside a partition.
//! Wiping everything is the `CLEAR_CACHE` control message.

use folio_client::CacheProxy;
use folio_client::fetch::canonicalize;
use folio_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition to purge.
    pub partition: String,

    /// Only purge entries captured for this URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted, or 1 for a dropped partition.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(proxy: &CacheProxy, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.partition.trim().is_empty() {
        return Err(Error::InvalidInput("partition cannot be empty".to_string()).into());
    }
    let db = proxy.db();

    let deleted = match params.url {
        Some(url) => {
            let url = canonicalize(&url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            db.delete_entries_by_url(&params.partition, url.as_str()).await?
        }
        None => u64::from(db.delete_partition(&params.partition).await?),
    };
    tracing::info!(partition = %params.partition, deleted, "cache purge");

    json_result(&CachePurgeOutput { deleted })
}
