//! sw_periodic_sync tool implementation.
//!
//! Handles the `update-content` periodic sync by refreshing the static
//! partition from the install manifest.

use folio_client::CacheProxy;
use folio_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

pub const UPDATE_CONTENT_TAG: &str = "update-content";

/// Input parameters for sw_periodic_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPeriodicSyncParams {
    /// Sync tag (default: "update-content").
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    UPDATE_CONTENT_TAG.into()
}

/// Implementation of the sw_periodic_sync tool.
pub async fn periodic_sync_impl(proxy: &CacheProxy, params: SwPeriodicSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag != UPDATE_CONTENT_TAG {
        return Err(Error::InvalidInput(format!("unknown sync tag: {}", params.tag)).into());
    }
    let report = proxy.periodic_refresh().await?;
    json_result(&report)
}
