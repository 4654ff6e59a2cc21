//! URL canonicalization for request descriptors.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http(s) scheme
/// 3. Lowercase the host (done by the parser for http(s))
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    finish(parsed)
}

/// Canonicalize `input`, resolving paths like `/app.js` against `base`.
///
/// Absolute URLs are accepted unchanged apart from normalization, so callers
/// can pass either form.
pub fn resolve(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    finish(parsed)
}

fn finish(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
    if parsed.host_str().is_none() {
        return Err(UrlError::InvalidUrl("missing host".into()));
    }
    parsed.set_fragment(None);
    Ok(parsed)
}
