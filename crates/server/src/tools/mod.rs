//! MCP tool implementations.
//!
//! This module contains all tools exposed by the folio-sw server. Every tool
//! replies with a pretty-printed JSON document as text content.

pub mod cache;
pub mod sw_fetch;
pub mod sw_message;
pub mod sw_notification_click;
pub mod sw_periodic_sync;
pub mod sw_push;

use folio_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
