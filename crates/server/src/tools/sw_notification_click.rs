//! sw_notification_click tool implementation.

use folio_client::CacheProxy;
use folio_client::proxy::Notification;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// The notification that was clicked, as returned by sw_push.
    pub notification: Notification,

    /// URLs of the page windows currently open.
    #[serde(default)]
    pub open_windows: Vec<String>,
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    proxy: &CacheProxy, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let action = proxy.on_notification_click(&params.notification, &params.open_windows);
    json_result(&action)
}
