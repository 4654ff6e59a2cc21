//! Push notifications: display with defaults, focus-or-open on click.
//!
//! The payload is whatever the push service delivered; fields we did not
//! produce (extra `data` keys) are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shellcache_core::{AppConfig, Error};

use crate::host::{ClientHost, ClientWindow};

/// Incoming push message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub notification: Option<PushFields>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Display fields a push message may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushFields {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
}

/// Fallbacks for fields missing from a push message.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl From<&AppConfig> for NotificationDefaults {
    fn from(config: &AppConfig) -> Self {
        Self { title: config.app_name.clone(), body: config.notification_body.clone(), icon: config.default_icon.clone() }
    }
}

/// A notification ready to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: Map<String, Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Notification {
    pub fn from_payload(payload: PushPayload, defaults: &NotificationDefaults) -> Self {
        let fields = payload.notification.unwrap_or_default();

        let mut data = payload.data.unwrap_or_default();
        let has_url = matches!(data.get("url"), Some(Value::String(url)) if !url.is_empty());
        if !has_url {
            data.insert("url".into(), Value::String("/".into()));
        }

        Self {
            title: non_empty(fields.title).unwrap_or_else(|| defaults.title.clone()),
            body: non_empty(fields.body).unwrap_or_else(|| defaults.body.clone()),
            icon: non_empty(fields.icon).unwrap_or_else(|| defaults.icon.clone()),
            badge: non_empty(fields.badge).unwrap_or_else(|| defaults.icon.clone()),
            data,
        }
    }

    /// URL to bring up when the notification is activated.
    pub fn target_url(&self) -> &str {
        match self.data.get("url") {
            Some(Value::String(url)) if !url.is_empty() => url,
            _ => "/",
        }
    }
}

/// What activating a notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(ClientWindow),
    Opened(ClientWindow),
}

/// Resolve defaults for `payload` and show it through the host.
pub async fn receive_push(
    host: &dyn ClientHost, payload: PushPayload, defaults: &NotificationDefaults,
) -> Result<Notification, Error> {
    let notification = Notification::from_payload(payload, defaults);
    host.show_notification(&notification).await?;
    Ok(notification)
}

/// Close the clicked notification, then focus the first window whose location
/// contains `target_url`, or open one.
pub async fn handle_click(host: &dyn ClientHost, target_url: &str) -> Result<ClickOutcome, Error> {
    host.close_notifications(target_url).await?;
    let windows = host.windows().await?;
    if let Some(window) = windows.into_iter().find(|w| w.url.contains(target_url)) {
        host.focus(window.id).await?;
        return Ok(ClickOutcome::Focused(ClientWindow { focused: true, ..window }));
    }
    let window = host.open_window(target_url).await?;
    Ok(ClickOutcome::Opened(window))
}
