//! Request descriptors and response snapshots.
//!
//! A [`RequestDescriptor`] is the identity of an outbound request and doubles
//! as the cache key. A [`ResponseSnapshot`] is the immutable capture of a
//! response at the moment it was stored.

use bytes::Bytes;
use url::Url;

/// Identity of an outbound request used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    method: String,
    url: Url,
}

impl RequestDescriptor {
    /// Create a descriptor. The method is upper-cased and the fragment dropped,
    /// since neither case nor fragments reach the network.
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    /// Shorthand for a `GET` descriptor.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host component of the target URL, if any.
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Only `GET` is intercepted; anything else passes straight through.
    pub fn is_safe(&self) -> bool {
        self.method == "GET"
    }
}

impl std::fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Immutable copy of a response: status, ordered headers and body.
///
/// Cloning is cheap (the body is reference counted) and yields an independent
/// value, so one network response can be both returned and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// URL the response was fetched from.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC3339 timestamp; set only on snapshots read back from a store.
    pub stored_at: Option<String>,
}

impl ResponseSnapshot {
    /// Whether the status is in the success range (200..=299).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The same response without store metadata, for content comparisons.
    pub fn without_metadata(&self) -> Self {
        Self { stored_at: None, ..self.clone() }
    }
}
