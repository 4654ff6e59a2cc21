//! worker_message and worker_status tool implementations.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shellcache_client::{ClientHost, ClientWindow, ControlMessage};
use shellcache_core::Error;

use crate::state::ShellState;

/// Input parameters for worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Control message, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageOutput {
    pub accepted: bool,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WindowSummary {
    pub id: u64,
    pub url: String,
    pub focused: bool,
    pub controlled: bool,
}

impl From<ClientWindow> for WindowSummary {
    fn from(w: ClientWindow) -> Self {
        Self { id: w.id, url: w.url, focused: w.focused, controlled: w.controlled }
    }
}

/// Output structure for worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub phase: String,
    pub version: String,
    pub skip_waiting: bool,
    pub pending_refreshes: usize,
    pub clients: Vec<WindowSummary>,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(state: &ShellState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let Some(message) = ControlMessage::parse(&params.message) else {
        return Err(Error::InvalidInput(format!("unsupported control message: {}", params.message)).into());
    };

    state.lifecycle.handle_message(message).await?;

    let output = WorkerMessageOutput { accepted: true, phase: state.lifecycle.phase().as_str().to_string() };
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}

/// Implementation of the worker_status tool.
pub async fn status_impl(state: &ShellState) -> Result<CallToolResult, McpError> {
    let clients = state.host.windows().await?.into_iter().map(WindowSummary::from).collect();

    let output = WorkerStatusOutput {
        phase: state.lifecycle.phase().as_str().to_string(),
        version: state.config.version.clone(),
        skip_waiting: state.host.skip_waiting_requested(),
        pending_refreshes: state.gateway.executor().pending_refreshes(),
        clients,
    };
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
