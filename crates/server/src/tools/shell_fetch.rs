//! shell_fetch tool implementation.
//!
//! Sends one request through the interception gateway, the same way a
//! client page would.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Interception, Served, Source, fetch::resolve};
use shellcache_core::{Error, RequestDescriptor, ResponseSnapshot};

use crate::state::ShellState;

/// Input parameters for shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else passes straight through.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level document load.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Output structure for shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<Header>,
    pub body: String,
    /// One of `network`, `cache`, `offline`, `passthrough`.
    pub source: String,
    /// When the served copy was stored, for cache hits.
    pub stored_at: Option<String>,
}

impl ShellFetchOutput {
    fn new(response: ResponseSnapshot, source: &str) -> Self {
        Self {
            body: response.text(),
            url: response.url,
            status: response.status,
            status_text: response.status_text,
            headers: response
                .headers
                .into_iter()
                .map(|(name, value)| Header { name, value })
                .collect(),
            source: source.to_string(),
            stored_at: response.stored_at,
        }
    }
}

/// Implementation of the shell_fetch tool.
pub async fn shell_fetch_impl(state: &ShellState, params: ShellFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let origin = state.config.origin_url().map_err(Error::from)?;
    let url = resolve(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = RequestDescriptor::new(&params.method, url);

    let output = match state.gateway.handle(&request, params.navigate).await? {
        Interception::Respond(Served { response, source }) => ShellFetchOutput::new(response, source.as_str()),
        Interception::Passthrough => {
            tracing::debug!("passing through {}", request);
            let response = state.gateway.executor().network().fetch(&request).await?;
            ShellFetchOutput::new(response, "passthrough")
        }
    };

    if output.source == Source::Offline.as_str() {
        tracing::info!(url = %output.url, "served offline page");
    }

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
