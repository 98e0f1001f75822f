//! Push messages and notification clicks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::CacheProxy;
use crate::fetch::url::{canonicalize, resolve};

/// Push message body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Decode push data. Data that is not a JSON object is shown as the body.
    pub fn parse(data: Option<&str>) -> Self {
        let Some(raw) = data.map(str::trim).filter(|d| !d.is_empty()) else {
            return Self::default();
        };
        serde_json::from_str(raw).unwrap_or_else(|_| Self { body: Some(raw.to_string()), ..Self::default() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Absolute URL opened on click.
    pub url: String,
}

/// What a notification click does to the page windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WindowAction {
    Focus { url: String },
    Open { url: String },
}

impl CacheProxy {
    /// Build the notification shown for a push message.
    pub fn notification_for(&self, payload: PushPayload) -> Notification {
        let target = payload.url.as_deref().unwrap_or("/");
        let url = match resolve(&self.options.origin, target) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!(url = target, error = %e, "push url rejected; using site root");
                self.options.origin.to_string()
            }
        };
        Notification {
            title: payload.title.unwrap_or_else(|| self.options.site_name.clone()),
            body: payload.body.unwrap_or_default(),
            url,
        }
    }

    /// Focus a window already showing the notification URL, else open one.
    pub fn on_notification_click(&self, notification: &Notification, open_windows: &[String]) -> WindowAction {
        let target = canonicalize(&notification.url).ok();
        let existing = open_windows
            .iter()
            .find(|window| target.is_some() && canonicalize(window).ok() == target);
        match existing {
            Some(window) => WindowAction::Focus { url: window.clone() },
            None => WindowAction::Open { url: notification.url.clone() },
        }
    }
}
