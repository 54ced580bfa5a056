//! Network side of the orchestrator.
//!
//! ### Semantics
//! - Mirrors the fetch API: any HTTP status is a successful fetch; only a
//!   transport failure (DNS, refused connection, reset, timeout) is an error.
//! - Redirects are followed up to a limit; the body is capped at `max_bytes`.
//! - Header names are stored lowercase, values that are not visible ASCII
//!   are dropped.

use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use stratus_core::{CacheRequest, CachedResponse, Error};

/// Issues network requests on behalf of the strategy executor.
///
/// This is the seam tests use to simulate an unreachable or flaky network.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request from the network.
    ///
    /// # Errors
    ///
    /// `Error::Network` when the transport fails; HTTP error statuses are
    /// returned as ordinary responses.
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stratus-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stratus-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&stratus_core::AppConfig> for FetchConfig {
    fn from(config: &stratus_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Fetcher`].
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
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(CachedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
        })
    }
}
