//! Network access for the caching layer.
//!
//! The [`Network`] trait is the only way strategies reach the network, so
//! hosts and tests can substitute their own transport.
//!
//! ### Failure semantics
//! - `Err` means a transport failure: unreachable host, aborted request,
//!   timeout, or a body over the byte limit.
//! - Any HTTP status, including 4xx/5xx, is `Ok` and returned as-is.

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use shellcache_core::{AppConfig, Error, RequestDescriptor, ResponseSnapshot};

/// Network transport used by the strategies.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request and capture the full response.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method(), e)))?;

        let response = self
            .http
            .request(method, request.url().as_str())
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let body: Bytes = response.bytes().await.map_err(transport_error)?;
        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ResponseSnapshot {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            stored_at: None,
        })
    }
}
