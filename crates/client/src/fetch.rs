//! HTTP origin fetch with size and redirect limits.
//!
//! ### Request shape
//! - Method and URL come from the request key; no rewriting beyond the
//!   key's own canonicalization.
//! - Redirects are followed up to a limit, and the final URL is reported.
//!
//! ### Safety gates
//! - Redirect chains stop at `max_redirects`.
//! - Bodies larger than `max_bytes` are rejected, never truncated.
//! - The timeout covers the whole request, connect through body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

use shltr_core::store::RequestKey;
use shltr_core::{Error, Origin, OriginResponse};

/// Configuration for the HTTP origin.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// User agent string (default: "shltr/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            user_agent: "shltr/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&shltr_core::AppConfig> for OriginConfig {
    fn from(config: &shltr_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
        }
    }
}

/// HTTP origin backed by a shared reqwest client.
pub struct HttpOrigin {
    http: Client,
    config: OriginConfig,
}

impl HttpOrigin {
    /// Create a new HTTP origin with the given configuration.
    pub fn new(config: OriginConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    /// Fetch one request from the origin, returning raw bytes and metadata.
    ///
    /// Respects redirect and byte limits. Non-2xx statuses are reported as
    /// errors so callers never cache them.
    async fn fetch(&self, key: &RequestKey) -> Result<OriginResponse, Error> {
        let start = Instant::now();
        let url = key.url().clone();

        let method = Method::from_bytes(key.method().as_bytes())
            .map_err(|e| Error::InvalidKey(format!("method {}: {}", key.method(), e)))?;

        let mut request = self.http.request(method, url.as_str());
        request = request.header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        );

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{}: {}", url, e))
            } else {
                Error::Http(format!("network error: {}", e))
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::Http(format!("status {}", status.as_u16())));
        }

        let content_length = response.content_length();
        if let Some(len) = content_length
            && len as usize > self.config.max_bytes
        {
            return Err(Error::TooLarge(format!("{} bytes over the {} limit", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let header_map = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::TooLarge(format!(
                "{} bytes over the {} limit",
                body.len(),
                self.config.max_bytes
            )));
        }

        let content_type = header_map
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let headers = header_map
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "origin {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            fetch_ms,
            body.len()
        );

        Ok(OriginResponse {
            url,
            final_url,
            status: status.as_u16(),
            content_type,
            headers,
            body,
            fetch_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_config_default() {
        let config = OriginConfig::default();
        assert_eq!(config.user_agent, "shltr/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_origin_config_from_app_config() {
        let app = shltr_core::AppConfig { max_bytes: 1024, timeout_ms: 500, ..Default::default() };
        let config = OriginConfig::from(&app);
        assert_eq!(config.user_agent, "shltr/0.1");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_http_origin_new() {
        let config = OriginConfig::default();
        let origin = HttpOrigin::new(config);
        assert!(origin.is_ok());
    }
}
