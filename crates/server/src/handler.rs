//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::ShellState;
use crate::tools::cache::{CacheGetParams, get_impl, list_impl};
use crate::tools::push::{NotificationClickParams, PushReceiveParams, click_impl, receive_impl};
use crate::tools::shell_fetch::{ShellFetchParams, shell_fetch_impl};
use crate::tools::worker::{WorkerMessageParams, message_impl, status_impl};

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

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellServer {
    state: Arc<ShellState>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShellServer {
    pub fn new(state: Arc<ShellState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Send a request through the interception gateway.
    #[tool(
        description = "Fetch a URL the way a controlled page would. Routes through the cache strategies; navigations fall back to the cached shell or an offline page."
    )]
    async fn shell_fetch(&self, params: Parameters<ShellFetchParams>) -> Result<CallToolResult, McpError> {
        shell_fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "List cache stores with entry counts and the store names the running version expects.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.state).await
    }

    #[tool(description = "Look up one cached response by store name and URL. Never touches the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "Deliver a control message from a client session, e.g. {\"type\": \"SKIP_WAITING\"}.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "Report the lifecycle phase, version tag, and controlled clients.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    /// Show a notification for an incoming push message.
    #[tool(description = "Handle a push message: show a notification, filling missing fields with defaults.")]
    async fn push_receive(&self, params: Parameters<PushReceiveParams>) -> Result<CallToolResult, McpError> {
        receive_impl(&self.state, params.0).await
    }

    #[tool(description = "Activate a notification: focus a window already showing the URL, or open a new one.")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.state, params.0).await
    }
}

impl ServerHandler for ShellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
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
