//! Content fingerprinting and URL normalization - the dedup keys.

use sha2::{Digest, Sha256};

/// Deterministic fingerprint of a result's core content.
///
/// Pure function of the three inputs: no timestamps, no salts, stable across
/// process restarts. Empty markdown is a valid input.
pub fn fingerprint(title: &str, url: &str, markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"||");
    hasher.update(url.as_bytes());
    hasher.update(b"||");
    hasher.update(markdown.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize a URL for dedup: force https, lowercase the host, strip the
/// trailing path slash, drop query string and fragment.
///
/// Unparseable input passes through unchanged - normalization fails open,
/// never errors.
pub fn normalize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match url::Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return raw.to_string(),
    };

    let path = parsed.path().trim_end_matches('/');
    match parsed.port() {
        Some(port) => format!("https://{host}:{port}{path}"),
        None => format!("https://{host}{path}"),
    }
}
