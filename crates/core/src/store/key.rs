//! Request identity: a normalized method plus a canonical URL.
//!
//! Every store entry is addressed by a `RequestKey`. Two textually
//! different URLs that canonicalize to the same form share one entry,
//! which is what makes cache-first serving deterministic.

use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Error type for request key construction failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyError {
    #[error("empty URL")]
    EmptyUrl,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid method: {0:?}")]
    InvalidMethod(String),
}

/// Identity of one interceptable request: method + canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: Url,
}

impl RequestKey {
    /// Build a key from a method token and a URL string.
    ///
    /// The method is uppercased; the URL goes through [`canonicalize`].
    pub fn new(method: &str, url: &str) -> Result<Self, KeyError> {
        let method = normalize_method(method)?;
        let url = canonicalize(url)?;
        Ok(Self { method, url })
    }

    /// Shorthand for the common GET key.
    pub fn get(url: &str) -> Result<Self, KeyError> {
        Self::new("GET", url)
    }

    /// Build a GET key for a path resolved against a base origin.
    pub fn from_path(base: &Url, path: &str) -> Result<Self, KeyError> {
        let joined = base.join(path).map_err(|e| KeyError::InvalidUrl(e.to_string()))?;
        Self::new("GET", joined.as_str())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Content-addressed store key: SHA-256 over the method and canonical URL.
    pub fn store_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

fn normalize_method(method: &str) -> Result<String, KeyError> {
    let trimmed = method.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(KeyError::InvalidMethod(method.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Canonicalize a URL string for consistent caching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, KeyError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(KeyError::EmptyUrl);
    }

    let url_str =
        if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| KeyError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(KeyError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(lowered.as_str()))
            .map_err(|e| KeyError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let a = RequestKey::get("https://example.com/app.js").unwrap();
        let b = RequestKey::get("https://example.com/app.js").unwrap();
        assert_eq!(a.store_hash(), b.store_hash());
    }

    #[test]
    fn test_hash_distinguishes_method() {
        let get = RequestKey::new("GET", "https://example.com/api").unwrap();
        let head = RequestKey::new("HEAD", "https://example.com/api").unwrap();
        assert_ne!(get.store_hash(), head.store_hash());
    }

    #[test]
    fn test_hash_format() {
        let key = RequestKey::get("https://example.com").unwrap();
        let hash = key.store_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_method_normalized() {
        let key = RequestKey::new("get", "https://example.com").unwrap();
        assert_eq!(key.method(), "GET");
    }

    #[test]
    fn test_invalid_method() {
        let result = RequestKey::new("G T", "https://example.com");
        assert!(matches!(result, Err(KeyError::InvalidMethod(_))));
    }

    #[test]
    fn test_equivalent_urls_share_key() {
        let a = RequestKey::get("https://EXAMPLE.com/shell#frag").unwrap();
        let b = RequestKey::get("https://example.com/shell").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.store_hash(), b.store_hash());
    }

    #[test]
    fn test_from_path() {
        let base = Url::parse("https://app.example").unwrap();
        let key = RequestKey::from_path(&base, "/manifest.json").unwrap();
        assert_eq!(key.url().as_str(), "https://app.example/manifest.json");
        assert_eq!(key.method(), "GET");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com#section").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://example.com?a=1&b=2").unwrap();
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(KeyError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        let result = canonicalize("   ");
        assert!(matches!(result, Err(KeyError::EmptyUrl)));
    }
}
