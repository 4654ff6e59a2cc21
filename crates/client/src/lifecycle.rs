//! Install and activate: shell pre-population and version rotation.
//!
//! Install fills the shell store before this instance may take over.
//! Activate deletes every store left behind by a previous version tag, then
//! claims the clients that are already open.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use shellcache_core::{AppConfig, Error, RequestDescriptor, ResponseSnapshot, StoreNames, StoreRegistry};

use crate::fetch::Network;
use crate::host::ClientHost;

/// Where this instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install or activation failed; this instance must not serve.
    Redundant,
}

impl WorkerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Parsed => "parsed",
            WorkerPhase::Installing => "installing",
            WorkerPhase::Installed => "installed",
            WorkerPhase::Activating => "activating",
            WorkerPhase::Activated => "activated",
            WorkerPhase::Redundant => "redundant",
        }
    }
}

/// Control messages a client session can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Take over now instead of waiting for existing clients to close.
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a raw message. Unknown shapes yield `None`.
    pub fn parse(value: &Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("ignoring control message {}: {}", value, e);
                None
            }
        }
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub required: Vec<String>,
    pub optional_cached: Vec<String>,
    pub optional_failed: Vec<String>,
}

/// Outcome of a successful activation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// Runs the install and activate phases against the shared registry.
pub struct LifecycleManager {
    config: Arc<AppConfig>,
    names: StoreNames,
    registry: Arc<dyn StoreRegistry>,
    network: Arc<dyn Network>,
    host: Arc<dyn ClientHost>,
    phase: watch::Sender<WorkerPhase>,
}

impl LifecycleManager {
    pub fn new(
        config: Arc<AppConfig>, registry: Arc<dyn StoreRegistry>, network: Arc<dyn Network>, host: Arc<dyn ClientHost>,
    ) -> Self {
        let names = config.store_names();
        Self { config, names, registry, network, host, phase: watch::Sender::new(WorkerPhase::Parsed) }
    }

    pub fn phase(&self) -> WorkerPhase {
        *self.phase.borrow()
    }

    pub fn store_names(&self) -> &StoreNames {
        &self.names
    }

    /// Pre-populate the shell store, then ask to take over immediately.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any required asset cannot be fetched
    /// with a success status or the batch cannot be stored; in that case
    /// nothing is written.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.phase.send_replace(WorkerPhase::Installing);
        tracing::info!(store = %self.names.shell, version = %self.config.version, "installing");

        let result = self.populate_shell().await;
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("install failed: {}", e);
                self.phase.send_replace(WorkerPhase::Redundant);
                return Err(e);
            }
        };

        self.host.skip_waiting().await?;
        self.phase.send_replace(WorkerPhase::Installed);
        tracing::info!(
            required = report.required.len(),
            optional_cached = report.optional_cached.len(),
            optional_failed = report.optional_failed.len(),
            "installed"
        );
        Ok(report)
    }

    async fn populate_shell(&self) -> Result<InstallReport, Error> {
        let store = self.registry.open(&self.names.shell).await?;

        let required = self.asset_requests(&self.config.required_assets)?;
        let responses = try_join_all(required.iter().map(|(path, req)| self.fetch_asset(path, req))).await?;
        let entries: Vec<(RequestDescriptor, ResponseSnapshot)> =
            required.iter().map(|(_, req)| req.clone()).zip(responses).collect();
        store.put_all(&entries).await.map_err(|e| Error::InstallFailed {
            asset: required.iter().map(|(path, _)| path.as_str()).collect::<Vec<_>>().join(", "),
            reason: format!("storing required assets: {e}"),
        })?;

        let optional = self.asset_requests(&self.config.optional_assets)?;
        let outcomes = join_all(optional.iter().map(|(path, req)| {
            let store = Arc::clone(&store);
            async move {
                let response = self.fetch_asset(path, req).await?;
                store.put(req, &response).await
            }
        }))
        .await;

        let mut report =
            InstallReport { required: required.into_iter().map(|(path, _)| path).collect(), ..Default::default() };
        for ((path, _), outcome) in optional.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.optional_cached.push(path),
                Err(e) => {
                    tracing::warn!(asset = %path, "optional asset not cached: {}", e);
                    report.optional_failed.push(path);
                }
            }
        }

        Ok(report)
    }

    fn asset_requests(&self, paths: &[String]) -> Result<Vec<(String, RequestDescriptor)>, Error> {
        paths
            .iter()
            .map(|path| Ok((path.clone(), RequestDescriptor::get(self.config.asset_url(path)?))))
            .collect()
    }

    async fn fetch_asset(&self, path: &str, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let failed = |reason: String| Error::InstallFailed { asset: path.to_string(), reason };
        let response = self.network.fetch(request).await.map_err(|e| failed(e.to_string()))?;
        if !response.is_success() {
            return Err(failed(format!("status {}", response.status)));
        }
        Ok(response)
    }

    /// Delete stores from superseded versions, then claim open clients.
    ///
    /// Only stores carrying the configured prefix are considered; anything
    /// else in the registry belongs to someone else and is left alone.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.phase.send_replace(WorkerPhase::Activating);

        let result = self.prune_and_claim().await;
        match &result {
            Ok(report) => {
                self.phase.send_replace(WorkerPhase::Activated);
                tracing::info!(deleted = ?report.deleted, claimed = report.claimed, "activated");
            }
            Err(e) => {
                tracing::error!("activation failed: {}", e);
                self.phase.send_replace(WorkerPhase::Redundant);
            }
        }
        result
    }

    async fn prune_and_claim(&self) -> Result<ActivateReport, Error> {
        let condemned: Vec<String> = self
            .registry
            .keys()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&self.config.cache_prefix) && !self.names.is_current(name))
            .collect();

        try_join_all(condemned.iter().map(|name| self.registry.delete(name))).await?;
        let claimed = self.host.claim().await?;

        Ok(ActivateReport { deleted: condemned, claimed })
    }

    /// Handle a control message from a client session.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::SkipWaiting => self.host.skip_waiting().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalHost;
    use crate::testing::{StubNetwork, app_config, get, snapshot};
    use serde_json::json;
    use shellcache_core::{CacheDb, CacheStore};

    /// Registry whose single store rejects every write.
    struct ReadOnlyRegistry;

    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl CacheStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }

        async fn lookup(&self, _request: &RequestDescriptor) -> Result<Option<ResponseSnapshot>, Error> {
            Ok(None)
        }

        async fn put(&self, _request: &RequestDescriptor, _snapshot: &ResponseSnapshot) -> Result<(), Error> {
            Err(Error::CorruptEntry("disk full".into()))
        }
    }

    #[async_trait::async_trait]
    impl StoreRegistry for ReadOnlyRegistry {
        async fn open(&self, _name: &str) -> Result<Arc<dyn CacheStore>, Error> {
            Ok(Arc::new(ReadOnlyStore))
        }

        async fn keys(&self) -> Result<Vec<String>, Error> {
            Ok(Vec::new())
        }

        async fn delete(&self, _name: &str) -> Result<bool, Error> {
            Ok(false)
        }
    }

    struct Fixture {
        network: Arc<StubNetwork>,
        db: CacheDb,
        host: Arc<LocalHost>,
        lifecycle: LifecycleManager,
    }

    async fn fixture(config: AppConfig) -> Fixture {
        let network = StubNetwork::new();
        let db = CacheDb::open_in_memory().await.unwrap();
        let host = Arc::new(LocalHost::new());
        let lifecycle =
            LifecycleManager::new(Arc::new(config), Arc::new(db.clone()), network.clone(), host.clone());
        Fixture { network, db, host, lifecycle }
    }

    fn small_config() -> AppConfig {
        AppConfig {
            required_assets: vec!["/".into(), "/index.html".into()],
            optional_assets: vec!["/icons/x.png".into()],
            ..app_config()
        }
    }

    #[tokio::test]
    async fn test_install_tolerates_missing_optional_asset() {
        let f = fixture(small_config()).await;
        f.network.respond("https://app.example/", 200, "<html>root</html>");
        f.network.respond("https://app.example/index.html", 200, "<html>index</html>");
        f.network.respond("https://app.example/icons/x.png", 404, "not found");

        let report = f.lifecycle.install().await.unwrap();

        assert_eq!(report.required, vec!["/", "/index.html"]);
        assert_eq!(report.optional_failed, vec!["/icons/x.png"]);
        assert_eq!(
            f.db.entry_urls("shellcache-shell-v1").await.unwrap(),
            vec!["https://app.example/", "https://app.example/index.html"]
        );
        assert_eq!(f.lifecycle.phase(), WorkerPhase::Installed);
        assert!(f.host.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_install_caches_reachable_optional_assets() {
        let f = fixture(small_config()).await;
        f.network.respond("https://app.example/", 200, "root");
        f.network.respond("https://app.example/index.html", 200, "index");
        f.network.respond("https://app.example/icons/x.png", 200, "png");

        let report = f.lifecycle.install().await.unwrap();

        assert_eq!(report.optional_cached, vec!["/icons/x.png"]);
        assert_eq!(f.db.entry_count("shellcache-shell-v1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_fails_on_missing_required_asset() {
        let f = fixture(small_config()).await;
        f.network.respond("https://app.example/", 200, "root");
        f.network.respond("https://app.example/index.html", 404, "gone");

        let err = f.lifecycle.install().await.unwrap_err();

        assert!(matches!(err, Error::InstallFailed { ref asset, .. } if asset == "/index.html"));
        assert_eq!(f.db.entry_count("shellcache-shell-v1").await.unwrap(), 0);
        assert_eq!(f.lifecycle.phase(), WorkerPhase::Redundant);
        assert!(!f.host.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_install_fails_when_offline() {
        let f = fixture(small_config()).await;
        let err = f.lifecycle.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { .. }));
    }

    #[tokio::test]
    async fn test_install_fails_when_required_write_fails() {
        let network = StubNetwork::new();
        network.respond("https://app.example/", 200, "root");
        network.respond("https://app.example/index.html", 200, "index");
        let host = Arc::new(LocalHost::new());
        let lifecycle =
            LifecycleManager::new(Arc::new(small_config()), Arc::new(ReadOnlyRegistry), network, host.clone());

        let err = lifecycle.install().await.unwrap_err();

        assert!(matches!(err, Error::InstallFailed { ref asset, .. } if asset == "/, /index.html"));
        assert_eq!(lifecycle.phase(), WorkerPhase::Redundant);
        assert!(!host.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_activate_rotates_versions() {
        let f = fixture(AppConfig { version: "v2".into(), ..app_config() }).await;
        for name in [
            "shellcache-shell-v1",
            "shellcache-runtime-v1",
            "shellcache-font-v1",
            "shellcache-shell-v2",
            "shellcache-runtime-v2",
            "shellcache-font-v2",
            "other-app-cache",
        ] {
            f.db.open(name).await.unwrap();
        }
        let stale = f.db.open("shellcache-shell-v1").await.unwrap();
        stale.put(&get("https://app.example/"), &snapshot("https://app.example/", 200, "old")).await.unwrap();

        let report = f.lifecycle.activate().await.unwrap();

        assert_eq!(report.deleted.len(), 3);
        let mut remaining = f.db.keys().await.unwrap();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["other-app-cache", "shellcache-font-v2", "shellcache-runtime-v2", "shellcache-shell-v2"]
        );
        assert_eq!(f.db.entry_count("shellcache-shell-v1").await.unwrap(), 0);
        assert_eq!(f.lifecycle.phase(), WorkerPhase::Activated);
    }

    #[tokio::test]
    async fn test_activate_claims_open_clients() {
        let f = fixture(app_config()).await;
        f.host.attach_window("https://app.example/").await;

        let report = f.lifecycle.activate().await.unwrap();

        assert_eq!(report.claimed, 1);
        assert!(f.host.windows().await.unwrap()[0].controlled);
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let f = fixture(app_config()).await;
        let message = ControlMessage::parse(&json!({ "type": "SKIP_WAITING" })).unwrap();

        f.lifecycle.handle_message(message).await.unwrap();

        assert!(f.host.skip_waiting_requested());
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        assert_eq!(ControlMessage::parse(&json!({ "type": "REFRESH" })), None);
        assert_eq!(ControlMessage::parse(&json!("SKIP_WAITING")), None);
    }
}
