//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

/// Compute the store key for a request.
///
/// `url` must already be canonical (absolute, fragment stripped). Method is
/// upper-cased so `get` and `GET` share an entry.
pub fn compute_cache_key(method: &str, url: &str, vary_headers: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_headers.as_bytes());
    hex::encode(hasher.finalize())
}
