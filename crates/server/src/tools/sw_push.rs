//! sw_push tool implementation.
//!
//! Turns push data into the notification the page would display.

use folio_client::CacheProxy;
use folio_client::proxy::PushPayload;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push data. JSON `{title, body, url}` or plain text used as the body.
    #[serde(default)]
    pub data: Option<String>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(proxy: &CacheProxy, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let payload = PushPayload::parse(params.data.as_deref());
    let notification = proxy.notification_for(payload);
    tracing::debug!(title = %notification.title, url = %notification.url, "push notification built");
    json_result(&notification)
}
