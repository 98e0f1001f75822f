//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use folio_client::CacheProxy;

use crate::tools::cache::{CacheListParams, CachePurgeParams, list_impl, purge_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_message::{SwMessageParams, message_impl};
use crate::tools::sw_notification_click::{SwNotificationClickParams, notification_click_impl};
use crate::tools::sw_periodic_sync::{SwPeriodicSyncParams, periodic_sync_impl};
use crate::tools::sw_push::{SwPushParams, push_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for folio-sw.
#[derive(Clone)]
pub struct FolioServer {
    tool_router: ToolRouter<Self>,
    proxy: Arc<CacheProxy>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl FolioServer {
    /// Create a new server handler around an installed proxy.
    pub fn new(proxy: Arc<CacheProxy>) -> Self {
        Self { tool_router: Self::tool_router(), proxy }
    }

    #[tool(
        description = "Intercept one page request through the caching proxy. Returns the route, the outcome tag (served_from_cache, served_from_network, served_from_fallback, failed) and the response."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Send a control message to the proxy: SKIP_WAITING, CLEAR_CACHE or GET_VERSION.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Build the notification shown for a push message with optional title, body and url.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Resolve a notification click: focus an open window at its URL or open a new one.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Run the update-content periodic sync: re-fetch the install manifest into the static partition.")]
    async fn sw_periodic_sync(&self, params: Parameters<SwPeriodicSyncParams>) -> Result<CallToolResult, McpError> {
        periodic_sync_impl(&self.proxy, params.0).await
    }

    #[tool(description = "List cache partitions, or the entries of one partition.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Purge one cache partition, or the entries of one URL inside it.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.proxy, params.0).await
    }
}

impl ServerHandler for FolioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "folio-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
