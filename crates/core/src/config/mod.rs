//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The configuration is passed explicitly into the route classifier and the
//! lifecycle manager; nothing reads it from ambient globals.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List-valued fields accept TOML arrays, including from the environment
/// (e.g. `SHELLCACHE_DATA_HOSTS='[api.example.com]'`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deploy-time version tag. Every store name is suffixed with it, so
    /// changing it on deploy rotates all stores at the next activation.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every store this process owns. Activation only prunes
    /// stores carrying this prefix.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// The application's own origin; requests to it are same-origin.
    ///
    /// Set via SHELLCACHE_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Path of the root document that backs offline navigations.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Shell assets that must be cached for installation to succeed.
    #[serde(default = "default_required_assets")]
    pub required_assets: Vec<String>,

    /// Shell assets cached on a best-effort basis.
    #[serde(default = "default_optional_assets")]
    pub optional_assets: Vec<String>,

    /// Hosts serving long-lived immutable assets (fonts, CDNs).
    #[serde(default = "default_font_hosts")]
    pub font_hosts: Vec<String>,

    /// Hosts serving mutable application data.
    #[serde(default = "default_data_hosts")]
    pub data_hosts: Vec<String>,

    /// Display name used for the offline page and default notification title.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Notification body used when a push payload carries none.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,

    /// Icon path shared by notifications (icon and badge defaults).
    #[serde(default = "default_icon")]
    pub default_icon: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "shellcache-".into()
}

fn default_app_origin() -> String {
    "http://localhost:8080".into()
}

fn default_root_document() -> String {
    "/index.html".into()
}

fn default_required_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/sw.js"].map(String::from).to_vec()
}

fn default_optional_assets() -> Vec<String> {
    ["/icons/icon-192.png", "/icons/icon-512.png", "/icons/icon-maskable.png"]
        .map(String::from)
        .to_vec()
}

fn default_font_hosts() -> Vec<String> {
    [
        "fonts.googleapis.com",
        "fonts.gstatic.com",
        "use.fontawesome.com",
        "cdnjs.cloudflare.com",
        "cdn.jsdelivr.net",
    ]
    .map(String::from)
    .to_vec()
}

fn default_data_hosts() -> Vec<String> {
    ["firestore.googleapis.com", "firebasestorage.googleapis.com", "storage.googleapis.com"]
        .map(String::from)
        .to_vec()
}

fn default_app_name() -> String {
    "Shell".into()
}

fn default_notification_body() -> String {
    "You have new updates.".into()
}

fn default_icon() -> String {
    "/icons/icon-192.png".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            app_origin: default_app_origin(),
            root_document: default_root_document(),
            required_assets: default_required_assets(),
            optional_assets: default_optional_assets(),
            font_hosts: default_font_hosts(),
            data_hosts: default_data_hosts(),
            app_name: default_app_name(),
            notification_body: default_notification_body(),
            default_icon: default_icon(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Names of the three current-version stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub shell: String,
    pub runtime: String,
    pub font: String,
}

impl StoreNames {
    pub fn all(&self) -> [&str; 3] {
        [&self.shell, &self.runtime, &self.font]
    }

    /// Whether `name` is one of the current-version stores.
    pub fn is_current(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Store names for the configured prefix and version tag.
    pub fn store_names(&self) -> StoreNames {
        let name = |kind: &str| format!("{}{}-{}", self.cache_prefix, kind, self.version);
        StoreNames { shell: name("shell"), runtime: name("runtime"), font: name("font") }
    }

    /// The application origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.app_origin)
            .map_err(|e| ConfigError::Invalid { field: "app_origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(ConfigError::Invalid { field: "app_origin".into(), reason: "must be an http(s) origin".into() }),
        }
    }

    /// Resolve a same-origin asset path against the application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or path cannot be parsed.
    pub fn asset_url(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "asset".into(), reason: format!("{path}: {e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
