//! push_receive and notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shellcache_client::{ClickOutcome, Notification, PushPayload, handle_click, receive_push};
use shellcache_core::Error;

use crate::state::ShellState;
use crate::tools::worker::WindowSummary;

/// Input parameters for push_receive tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushReceiveParams {
    /// Push message body: optional `notification` and `data` objects.
    #[serde(default)]
    pub payload: Value,
}

/// Input parameters for notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Target URL from the notification data (default: "/").
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    /// `focused` or `opened`.
    pub action: String,
    pub window: WindowSummary,
}

/// Implementation of the push_receive tool.
pub async fn receive_impl(state: &ShellState, params: PushReceiveParams) -> Result<CallToolResult, McpError> {
    let payload: PushPayload = match params.payload {
        Value::Null => PushPayload::default(),
        value => serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("invalid push payload: {e}")))?,
    };

    let notification: Notification = receive_push(state.host.as_ref(), payload, &state.defaults).await?;
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&notification).unwrap_or_default(),
    )]))
}

/// Implementation of the notification_click tool.
pub async fn click_impl(state: &ShellState, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let url = params.url.filter(|u| !u.is_empty()).unwrap_or_else(|| "/".into());

    let output = match handle_click(state.host.as_ref(), &url).await? {
        ClickOutcome::Focused(window) => NotificationClickOutput { action: "focused".into(), window: window.into() },
        ClickOutcome::Opened(window) => NotificationClickOutput { action: "opened".into(), window: window.into() },
    };
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
