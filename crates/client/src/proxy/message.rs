//! Control messages sent by pages to the proxy.

use folio_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::CacheProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate an installed worker without waiting.
    SkipWaiting,
    /// Delete every partition.
    ClearCache,
    /// Report the active epoch token.
    GetVersion,
}

impl ControlMessage {
    /// Decode a message body. Anything without a known `type` is rejected.
    pub fn parse(value: &serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value.clone()).map_err(|e| {
            let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("<missing>");
            Error::InvalidInput(format!("unknown control message type {kind}: {e}"))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VersionReply {
    pub version: String,
}

impl CacheProxy {
    /// Apply a control message. Only `GET_VERSION` produces a reply.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<Option<VersionReply>, Error> {
        tracing::debug!(?message, "control message");
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting().await?;
                Ok(None)
            }
            ControlMessage::ClearCache => {
                self.clear_all().await?;
                Ok(None)
            }
            ControlMessage::GetVersion => Ok(Some(VersionReply { version: self.version().to_string() })),
        }
    }
}
