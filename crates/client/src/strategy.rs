//! The three caching strategies.
//!
//! Strategies run against whatever store handle the caller opened and never
//! decide routing themselves. Only success-status responses are written to a
//! store; error responses are returned to the caller untouched.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use shellcache_core::{CacheStore, Error, RequestDescriptor, ResponseSnapshot};

use crate::fetch::Network;
use crate::route::Strategy;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
    /// Synthesized offline placeholder.
    Offline,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
            Source::Offline => "offline",
        }
    }
}

/// A response handed back to the caller.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: Source,
}

impl Served {
    pub fn network(response: ResponseSnapshot) -> Self {
        Self { response, source: Source::Network }
    }

    pub fn cache(response: ResponseSnapshot) -> Self {
        Self { response, source: Source::Cache }
    }

    pub fn offline(response: ResponseSnapshot) -> Self {
        Self { response, source: Source::Offline }
    }
}

/// Runs strategies and owns the background refreshes they spawn.
///
/// Refreshes are tracked so the host can wait for them before shutting down
/// (see [`StrategyExecutor::settle`]).
#[derive(Clone)]
pub struct StrategyExecutor {
    network: Arc<dyn Network>,
    tasks: TaskTracker,
}

impl StrategyExecutor {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network, tasks: TaskTracker::new() }
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Number of background refreshes still running.
    pub fn pending_refreshes(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every background refresh spawned so far has finished.
    ///
    /// The executor stays usable afterwards.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    pub async fn execute(
        &self, strategy: Strategy, request: &RequestDescriptor, store: Arc<dyn CacheStore>,
    ) -> Result<Served, Error> {
        match strategy {
            Strategy::CacheFirst => self.cache_first(request, store).await,
            Strategy::NetworkFirst => self.network_first(request, store).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, store).await,
        }
    }

    /// Stored snapshot if present, otherwise the network.
    pub async fn cache_first(&self, request: &RequestDescriptor, store: Arc<dyn CacheStore>) -> Result<Served, Error> {
        if let Some(cached) = lookup(store.as_ref(), request).await {
            tracing::debug!(store = store.name(), "cache hit for {}", request);
            return Ok(Served::cache(cached));
        }

        tracing::debug!(store = store.name(), "cache miss for {}", request);
        let response = self.network.fetch(request).await?;
        store_if_success(store.as_ref(), request, &response).await;
        Ok(Served::network(response))
    }

    /// The network if reachable, otherwise the stored snapshot.
    pub async fn network_first(&self, request: &RequestDescriptor, store: Arc<dyn CacheStore>) -> Result<Served, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                store_if_success(store.as_ref(), request, &response).await;
                Ok(Served::network(response))
            }
            Err(err) => match lookup(store.as_ref(), request).await {
                Some(cached) => {
                    tracing::debug!(store = store.name(), "network failed for {}, serving cache: {}", request, err);
                    Ok(Served::cache(cached))
                }
                None => Err(err),
            },
        }
    }

    /// Stored snapshot immediately, refreshed in the background; waits on the
    /// network only when nothing is stored.
    pub async fn stale_while_revalidate(
        &self, request: &RequestDescriptor, store: Arc<dyn CacheStore>,
    ) -> Result<Served, Error> {
        if let Some(cached) = lookup(store.as_ref(), request).await {
            let network = Arc::clone(&self.network);
            let request = request.clone();
            self.tasks.spawn(async move {
                match network.fetch(&request).await {
                    Ok(response) => store_if_success(store.as_ref(), &request, &response).await,
                    Err(err) => tracing::debug!("background refresh of {} failed: {}", request, err),
                }
            });
            return Ok(Served::cache(cached));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store_if_success(store.as_ref(), request, &response).await;
                Ok(Served::network(response))
            }
            // A concurrent refresh may have filled the store meanwhile.
            Err(err) => lookup(store.as_ref(), request).await.map(Served::cache).ok_or(err),
        }
    }
}

/// Store lookup where read failures count as misses.
pub(crate) async fn lookup(store: &dyn CacheStore, request: &RequestDescriptor) -> Option<ResponseSnapshot> {
    match store.lookup(request).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(store = store.name(), "cache read failed for {}: {}", request, err);
            None
        }
    }
}

/// Persist a copy of `response` when its status is in the success range.
/// Write failures are logged; the caller still gets the response.
pub(crate) async fn store_if_success(store: &dyn CacheStore, request: &RequestDescriptor, response: &ResponseSnapshot) {
    if !response.is_success() {
        tracing::debug!(store = store.name(), status = response.status, "not caching {}", request);
        return;
    }
    if let Err(err) = store.put(request, response).await {
        tracing::warn!(store = store.name(), "cache write failed for {}: {}", request, err);
    }
}
