//! cache_list tool implementation.
//!
//! Lists partitions, or the entries of one partition.

use folio_client::CacheProxy;
use folio_core::{EntrySummary, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List the entries of this partition instead of the partitions.
    #[serde(default)]
    pub partition: Option<String>,
}

/// One partition in the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    /// Whether the partition belongs to the active epoch.
    pub current: bool,
    pub entries: usize,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<Vec<PartitionSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntrySummary>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(proxy: &CacheProxy, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let db = proxy.db();
    let version = proxy.version().to_string();

    let output = match params.partition {
        Some(name) => {
            if !db.has_partition(&name).await? {
                return Err(Error::CacheMiss(format!("no partition named {name}")).into());
            }
            CacheListOutput { version, partitions: None, entries: Some(db.list_entries(&name).await?) }
        }
        None => {
            let mut partitions = Vec::new();
            for name in db.partition_names().await? {
                let entries = db.list_entries(&name).await?.len();
                partitions.push(PartitionSummary { current: proxy.names().owns(&name), name, entries });
            }
            CacheListOutput { version, partitions: Some(partitions), entries: None }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{activated_proxy, parse_output};

    #[tokio::test]
    async fn test_list_partitions() {
        let proxy = activated_proxy().await;

        let result = list_impl(&proxy, CacheListParams::default()).await.unwrap();
        let output: CacheListOutput = parse_output(&result);

        let partitions = output.partitions.unwrap();
        assert_eq!(partitions.len(), 6);
        assert!(partitions.iter().all(|p| p.current));
        let shell = partitions.iter().find(|p| p.name == "folio-static-v3").unwrap();
        assert_eq!(shell.entries, 2);
    }

    #[tokio::test]
    async fn test_list_entries() {
        let proxy = activated_proxy().await;
        let params = CacheListParams { partition: Some("folio-static-v3".into()) };

        let result = list_impl(&proxy, params).await.unwrap();
        let output: CacheListOutput = parse_output(&result);

        let urls: Vec<_> = output.entries.unwrap().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["https://jdoe.example.edu/", "https://jdoe.example.edu/index.html"]);
    }

    #[tokio::test]
    async fn test_list_unknown_partition() {
        let proxy = activated_proxy().await;
        let params = CacheListParams { partition: Some("folio-static-v0".into()) };

        let err = list_impl(&proxy, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }
}
