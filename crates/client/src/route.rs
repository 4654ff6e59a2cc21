//! Request routing: which store and which strategy serve a request.

use std::collections::HashSet;

use url::{Origin, Url};

use shellcache_core::{AppConfig, ConfigError, RequestDescriptor, StoreNames};

/// Caching strategy applied to a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve the stored snapshot; only go to the network on a miss.
    CacheFirst,
    /// Go to the network; fall back to the stored snapshot on failure.
    NetworkFirst,
    /// Serve the stored snapshot now and refresh it in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

/// Which of the three stores a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Shell,
    Runtime,
    Font,
}

impl StoreKind {
    /// Current-version name of this store.
    pub fn store_name(self, names: &StoreNames) -> &str {
        match self {
            StoreKind::Shell => &names.shell,
            StoreKind::Runtime => &names.runtime,
            StoreKind::Font => &names.font,
        }
    }
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; default network handling applies.
    Passthrough,
    /// Top-level document load, handled by the navigation fallback path.
    Navigation,
    /// Served by `strategy` against the `store` store.
    Cached { store: StoreKind, strategy: Strategy },
}

/// Maps requests to routes. Pure: no I/O, no shared state.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    origin: Origin,
    font_hosts: HashSet<String>,
    data_hosts: HashSet<String>,
}

impl RouteClassifier {
    pub fn new(origin: &Url, font_hosts: &[String], data_hosts: &[String]) -> Self {
        let normalize = |hosts: &[String]| hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        Self { origin: origin.origin(), font_hosts: normalize(font_hosts), data_hosts: normalize(data_hosts) }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.origin_url()?, &config.font_hosts, &config.data_hosts))
    }

    /// Classify a request. First matching rule wins:
    ///
    /// 1. non-GET → pass through
    /// 2. navigation → navigation fallback
    /// 3. same origin → shell, cache-first
    /// 4. font/CDN host → font, stale-while-revalidate
    /// 5. data host → runtime, network-first
    /// 6. anything else → runtime, stale-while-revalidate
    pub fn classify(&self, request: &RequestDescriptor, is_navigation: bool) -> Route {
        if !request.is_safe() {
            return Route::Passthrough;
        }
        if is_navigation {
            return Route::Navigation;
        }
        if request.url().origin() == self.origin {
            return Route::Cached { store: StoreKind::Shell, strategy: Strategy::CacheFirst };
        }

        let host = request.host().unwrap_or_default();
        if self.font_hosts.contains(host) {
            Route::Cached { store: StoreKind::Font, strategy: Strategy::StaleWhileRevalidate }
        } else if self.data_hosts.contains(host) {
            Route::Cached { store: StoreKind::Runtime, strategy: Strategy::NetworkFirst }
        } else {
            Route::Cached { store: StoreKind::Runtime, strategy: Strategy::StaleWhileRevalidate }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RouteClassifier {
        let config = AppConfig { app_origin: "https://app.example".into(), ..Default::default() };
        RouteClassifier::from_config(&config).unwrap()
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_passes_through() {
        let req = RequestDescriptor::new("POST", Url::parse("https://app.example/api").unwrap());
        assert_eq!(classifier().classify(&req, false), Route::Passthrough);
        assert_eq!(classifier().classify(&req, true), Route::Passthrough);
    }

    #[test]
    fn test_navigation_wins_over_origin() {
        assert_eq!(classifier().classify(&get("https://app.example/reports"), true), Route::Navigation);
    }

    #[test]
    fn test_same_origin_is_shell_cache_first() {
        assert_eq!(
            classifier().classify(&get("https://app.example/app.js"), false),
            Route::Cached { store: StoreKind::Shell, strategy: Strategy::CacheFirst }
        );
    }

    #[test]
    fn test_same_host_different_scheme_is_cross_origin() {
        let route = classifier().classify(&get("http://app.example/app.js"), false);
        assert_eq!(route, Route::Cached { store: StoreKind::Runtime, strategy: Strategy::StaleWhileRevalidate });
    }

    #[test]
    fn test_font_host() {
        assert_eq!(
            classifier().classify(&get("https://fonts.gstatic.com/s/inter.woff2"), false),
            Route::Cached { store: StoreKind::Font, strategy: Strategy::StaleWhileRevalidate }
        );
    }

    #[test]
    fn test_data_host() {
        assert_eq!(
            classifier().classify(&get("https://firestore.googleapis.com/v1/projects/x"), false),
            Route::Cached { store: StoreKind::Runtime, strategy: Strategy::NetworkFirst }
        );
    }

    #[test]
    fn test_other_host_defaults_to_runtime_revalidate() {
        assert_eq!(
            classifier().classify(&get("https://images.example.net/a.png"), false),
            Route::Cached { store: StoreKind::Runtime, strategy: Strategy::StaleWhileRevalidate }
        );
    }

    #[test]
    fn test_font_rule_precedes_data_rule() {
        let origin = Url::parse("https://app.example").unwrap();
        let both = vec!["cdn.example.com".to_string()];
        let classifier = RouteClassifier::new(&origin, &both, &both);
        assert_eq!(
            classifier.classify(&get("https://cdn.example.com/x"), false),
            Route::Cached { store: StoreKind::Font, strategy: Strategy::StaleWhileRevalidate }
        );
    }

    #[test]
    fn test_store_kind_names() {
        let names = AppConfig::default().store_names();
        assert_eq!(StoreKind::Shell.store_name(&names), "shellcache-shell-v1");
        assert_eq!(StoreKind::Runtime.store_name(&names), "shellcache-runtime-v1");
        assert_eq!(StoreKind::Font.store_name(&names), "shellcache-font-v1");
    }
}
