//! Shared state behind every tool call.

use std::sync::Arc;

use shellcache_client::{Gateway, LifecycleManager, LocalHost, Network, NotificationDefaults};
use shellcache_core::{AppConfig, CacheDb, Error};

/// Everything the tools need: the store database, the gateway, the lifecycle
/// manager, and the in-process client host they all share.
pub struct ShellState {
    pub config: Arc<AppConfig>,
    pub db: CacheDb,
    pub host: Arc<LocalHost>,
    pub gateway: Gateway,
    pub lifecycle: LifecycleManager,
    pub defaults: NotificationDefaults,
}

impl ShellState {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let config = Arc::new(config);
        let host = Arc::new(LocalHost::new());
        let registry = Arc::new(db.clone());

        let gateway = Gateway::new(Arc::clone(&config), registry.clone(), Arc::clone(&network))?;
        let lifecycle = LifecycleManager::new(Arc::clone(&config), registry, network, host.clone());
        let defaults = NotificationDefaults::from(config.as_ref());

        Ok(Self { config, db, host, gateway, lifecycle, defaults })
    }
}
