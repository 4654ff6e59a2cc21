//! Single entry point for intercepted requests.
//!
//! The gateway asks the classifier where a request belongs, opens that store
//! by name, and hands both to the strategy executor. Navigations take their
//! own path with a root-document fallback and, as a last resort, the offline
//! placeholder.

use std::sync::Arc;

use url::Url;

use shellcache_core::{AppConfig, CacheStore, Error, RequestDescriptor, StoreNames, StoreRegistry};

use crate::fetch::Network;
use crate::offline::offline_response;
use crate::route::{Route, RouteClassifier};
use crate::strategy::{Served, StrategyExecutor, lookup, store_if_success};

/// What the gateway did with a request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Not ours; the caller should use its default network handling.
    Passthrough,
    Respond(Served),
}

pub struct Gateway {
    config: Arc<AppConfig>,
    names: StoreNames,
    classifier: RouteClassifier,
    registry: Arc<dyn StoreRegistry>,
    executor: StrategyExecutor,
    root: RequestDescriptor,
}

impl Gateway {
    /// # Errors
    ///
    /// Returns `Error::Config` if the origin or root document cannot be parsed.
    pub fn new(config: Arc<AppConfig>, registry: Arc<dyn StoreRegistry>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let classifier = RouteClassifier::from_config(&config)?;
        let root = RequestDescriptor::get(config.asset_url(&config.root_document)?);
        let names = config.store_names();
        Ok(Self { config, names, classifier, registry, executor: StrategyExecutor::new(network), root })
    }

    pub fn executor(&self) -> &StrategyExecutor {
        &self.executor
    }

    pub fn store_names(&self) -> &StoreNames {
        &self.names
    }

    /// Key every successful navigation is also stored under.
    pub fn root_url(&self) -> &Url {
        self.root.url()
    }

    /// Route and serve one request.
    ///
    /// # Errors
    ///
    /// Ordinary requests surface a transport failure when no stored copy is
    /// available. Navigations never fail on transport; they fall back to the
    /// offline placeholder instead.
    pub async fn handle(&self, request: &RequestDescriptor, is_navigation: bool) -> Result<Interception, Error> {
        let route = self.classifier.classify(request, is_navigation);
        tracing::debug!(navigation = is_navigation, "routing {} as {:?}", request, route);

        match route {
            Route::Passthrough => Ok(Interception::Passthrough),
            Route::Navigation => Ok(Interception::Respond(self.navigate(request).await)),
            Route::Cached { store, strategy } => {
                let name = store.store_name(&self.names);
                let served = match self.open_store(name).await {
                    Some(store) => self.executor.execute(strategy, request, store).await?,
                    None => Served::network(self.executor.network().fetch(request).await?),
                };
                Ok(Interception::Respond(served))
            }
        }
    }

    async fn navigate(&self, request: &RequestDescriptor) -> Served {
        let store = self.open_store(&self.names.shell).await;

        let err = match self.executor.network().fetch(request).await {
            Ok(response) => {
                if let Some(store) = &store {
                    store_if_success(store.as_ref(), request, &response).await;
                    if *request != self.root {
                        store_if_success(store.as_ref(), &self.root, &response).await;
                    }
                }
                return Served::network(response);
            }
            Err(err) => err,
        };

        tracing::info!("navigation to {} failed, trying shell store: {}", request, err);
        if let Some(store) = &store {
            for key in [request, &self.root] {
                if let Some(cached) = lookup(store.as_ref(), key).await {
                    return Served::cache(cached);
                }
            }
        }

        tracing::info!("serving offline page for {}", request);
        Served::offline(offline_response(&self.config.app_name, request.url().as_str()))
    }

    /// Open a store by name; failures are logged and treated as no store.
    async fn open_store(&self, name: &str) -> Option<Arc<dyn CacheStore>> {
        match self.registry.open(name).await {
            Ok(store) => Some(store),
            Err(err) => {
                tracing::warn!(store = name, "could not open store: {}", err);
                None
            }
        }
    }
}
