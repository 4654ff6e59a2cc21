//! cache_list tool implementation.
//!
//! Lists every store in the registry with its entry count.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, StoreRegistry};

use crate::state::ShellState;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    /// Whether the store belongs to the running version.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
    /// Store names the running version expects.
    pub expected: Vec<String>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(state: &ShellState) -> Result<CallToolResult, McpError> {
    let names = state.gateway.store_names();

    let mut stores = Vec::new();
    for name in state.db.keys().await? {
        let entries = state.db.entry_count(&name).await?;
        let current = names.is_current(&name);
        stores.push(StoreSummary { name, entries, current });
    }

    let output = CacheListOutput { stores, expected: names.all().iter().map(|n| n.to_string()).collect() };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{output, state};

    #[tokio::test]
    async fn test_list_empty_registry() {
        let (_network, state) = state().await;

        let out: CacheListOutput = output(&list_impl(&state).await.unwrap());

        assert!(out.stores.is_empty());
        assert_eq!(
            out.expected,
            vec!["shellcache-shell-v1", "shellcache-runtime-v1", "shellcache-font-v1"]
        );
    }

    #[tokio::test]
    async fn test_list_marks_stale_stores() {
        let (_network, state) = state().await;
        state.db.open("shellcache-shell-v0").await.unwrap();
        state.db.open("shellcache-shell-v1").await.unwrap();

        let out: CacheListOutput = output(&list_impl(&state).await.unwrap());

        assert_eq!(out.stores.len(), 2);
        assert!(!out.stores[0].current);
        assert!(out.stores[1].current);
        assert_eq!(out.stores[1].entries, 0);
    }
}
