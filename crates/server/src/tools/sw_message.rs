//! sw_message tool implementation.
//!
//! Delivers a control message (`SKIP_WAITING`, `CLEAR_CACHE`, `GET_VERSION`)
//! to the proxy.

use folio_client::proxy::VersionReply;
use folio_client::{CacheProxy, ControlMessage, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object with a `type` field, e.g. `{"type": "GET_VERSION"}`.
    pub message: serde_json::Value,
}

/// Output structure for sw_message tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwMessageOutput {
    pub message: ControlMessage,
    /// Present for `GET_VERSION` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<VersionReply>,
    /// Worker state after the message was applied.
    pub state: WorkerState,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(proxy: &CacheProxy, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::parse(&params.message)?;
    let reply = proxy.handle_message(message).await?;
    let state = proxy.state().await;

    json_result(&SwMessageOutput { message, reply, state })
}
