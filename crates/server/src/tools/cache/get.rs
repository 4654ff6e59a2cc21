//! cache_get tool implementation.
//!
//! Looks up one entry in a named store without touching the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_core::{Error, RequestDescriptor, StoreRegistry};

use crate::state::ShellState;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Store name, as reported by cache_list.
    pub store: String,

    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub size: usize,
    pub stored_at: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &ShellState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let origin = state.config.origin_url().map_err(Error::from)?;
    let url = resolve(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    // Opening creates missing stores, so check the registry first.
    if !state.db.keys().await?.contains(&params.store) {
        return Err(Error::CacheMiss(format!("no store named {}", params.store)).into());
    }

    let store = state.db.open(&params.store).await?;
    let snapshot = store
        .lookup(&RequestDescriptor::get(url.clone()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        store: params.store,
        content_type: snapshot.content_type().map(str::to_string),
        size: snapshot.body.len(),
        url: snapshot.url,
        status: snapshot.status,
        stored_at: snapshot.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize snapshot: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
