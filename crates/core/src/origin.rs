//! The origin-fetch port.
//!
//! The store's precache batch, the interception pipeline and the identity
//! detector all reach the live network through this trait, so the gateway
//! can run against the real HTTP origin in production and an in-process
//! fake in tests.

use crate::Error;
use crate::store::key::RequestKey;
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// One response from the live origin.
#[derive(Debug, Clone)]
pub struct OriginResponse {
    /// The URL that was requested.
    pub url: Url,
    /// The final URL after redirects.
    pub final_url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header, if present.
    pub content_type: Option<String>,
    /// Response headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Bytes,
    /// Time taken to fetch in milliseconds.
    pub fetch_ms: u64,
}

/// Live-network access used to fill the response store.
///
/// Implementations must resolve to a successful response or an error;
/// there is no retry layer on top of this trait.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch one request from the origin.
    async fn fetch(&self, key: &RequestKey) -> Result<OriginResponse, Error>;
}
