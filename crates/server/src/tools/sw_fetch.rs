//! sw_fetch tool implementation.
//!
//! Intercepts one page request through the caching proxy and reports how it
//! was resolved.

use std::collections::BTreeMap;

use folio_client::proxy::{BypassReason, FallbackKind, Route, Strategy};
use folio_client::{CacheProxy, Destination, ProxyRequest, RequestMode};
use folio_core::{Error, PartitionRole};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL requested by the page.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, image, font, style, script, manifest, empty, other.
    #[serde(default)]
    pub destination: Destination,

    /// Request mode: navigate, same-origin, cors (default), no-cors.
    #[serde(default)]
    pub mode: RequestMode,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, forwarded on passthrough (non-GET requests are never cached).
    #[serde(default)]
    pub body: Option<String>,

    /// Maximum body characters echoed back (default: 4096).
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_body_chars() -> usize {
    4096
}

/// How the router classified the request.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RouteOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass: Option<BypassReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PartitionRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

/// The response handed back to the page.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ResponseOutput {
    pub url: String,
    pub status: u16,
    pub opaque: bool,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
    /// Body as UTF-8 text, cut at `max_body_chars`.
    pub body: String,
    pub body_truncated: bool,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub route: RouteOutput,
    /// served_from_cache, served_from_network, served_from_fallback or failed.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(proxy: &CacheProxy, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut request = ProxyRequest {
        method: params.method,
        body: params.body.map(String::into_bytes),
        ..ProxyRequest::get(params.url, params.destination)
    }
    .with_mode(params.mode);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let handled = proxy.handle(&request).await;

    let route = match &handled.route {
        Route::Bypass(reason) => RouteOutput { bypass: Some(*reason), partition: None, role: None, strategy: None },
        Route::Cache { role, strategy, .. } => RouteOutput {
            bypass: None,
            partition: Some(proxy.names().partition(*role)),
            role: Some(*role),
            strategy: Some(*strategy),
        },
    };

    let outcome = handled.outcome.tag().to_string();
    let fallback = handled.outcome.fallback_kind();
    let (response, error) = match handled.outcome.into_result() {
        Ok(response) => {
            let text = response.text();
            let body_truncated = text.chars().count() > params.max_body_chars;
            let body = text.chars().take(params.max_body_chars).collect();
            let output = ResponseOutput {
                body_bytes: response.body.len(),
                body,
                body_truncated,
                url: response.url,
                status: response.status,
                opaque: response.opaque,
                headers: response.headers,
            };
            (Some(output), None)
        }
        Err(err) => (None, Some(err.to_string())),
    };

    json_result(&SwFetchOutput { route, outcome, fallback, response, error })
}
