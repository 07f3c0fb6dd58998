//! Request fingerprinting for logs and diagnostics
//!
//! The fingerprint identifies a request shape independently of header order,
//! header name case and query parameter order. It is never used for matching,
//! only to give misses and recorded interactions a stable short id.

use sha2::{Digest, Sha256};

use crate::interaction::Request;
use crate::matcher::{query_pairs, split_url};

/// Number of fingerprint bytes rendered in log lines
pub const SHORT_LEN: usize = 8;

/// Compute SHA-256 fingerprint of a request
///
/// The fingerprint includes:
/// 1. Method
/// 2. URL without query
/// 3. Query parameters (sorted)
/// 4. Headers (sorted, lowercase names, trimmed values)
/// 5. Body
#[must_use]
pub fn fingerprint_request(request: &Request) -> [u8; 32] {
    let mut hasher = Sha256::new();

    // 1. Method
    let method = request.method.as_str();
    hasher.update((method.len() as u32).to_le_bytes());
    hasher.update(method.as_bytes());

    // 2. URL without query
    let (base, query) = split_url(&request.url);
    hasher.update((base.len() as u32).to_le_bytes());
    hasher.update(base.as_bytes());

    // 3. Query parameters (sorted)
    let mut query = query.map(query_pairs).unwrap_or_default();
    query.sort();
    hasher.update((query.len() as u32).to_le_bytes());
    for (key, value) in &query {
        hasher.update((key.len() as u32).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update((value.len() as u32).to_le_bytes());
        hasher.update(value.as_bytes());
    }

    // 4. Headers (sorted, normalized)
    let mut headers: Vec<(String, &str)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in &headers {
        hasher.update((name.len() as u32).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update((value.len() as u32).to_le_bytes());
        hasher.update(value.as_bytes());
    }

    // 5. Body
    let body = request.body.as_bytes();
    hasher.update((body.len() as u64).to_le_bytes());
    hasher.update(body);

    hasher.finalize().into()
}

/// Short hex form of a request fingerprint
#[must_use]
pub fn short_fingerprint(request: &Request) -> String {
    hex::encode(&fingerprint_request(request)[..SHORT_LEN])
}
