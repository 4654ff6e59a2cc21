//! Cache key generation for store entries.

use sha2::{Digest, Sha256};

use crate::RequestDescriptor;

/// Compute the entry key for a request: SHA-256 over method and URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Entry key for a request descriptor.
pub fn descriptor_key(request: &RequestDescriptor) -> String {
    compute_cache_key(request.method(), request.url().as_str())
}
