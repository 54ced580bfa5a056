//! sw_fetch tool implementation.
//!
//! Routes a request through the orchestrator as if the page had issued it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stratus_core::{CacheRequest, Destination, Error, Strategy};

use crate::worker::{Orchestrator, ResponseSource};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// The absolute request URL.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are stored.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination, e.g. "image", "script", "document" (default: empty).
    #[serde(default)]
    pub destination: Destination,

    /// Override the classified strategy.
    #[serde(default)]
    pub strategy: Option<Strategy>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// False when the request was not intercepted (non-http(s) scheme).
    pub intercepted: bool,
    /// "cache", "network" or "offline".
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
    /// Whether a background refresh of the stored entry was started.
    #[serde(default)]
    pub revalidating: bool,
}

impl SwFetchOutput {
    fn passthrough() -> Self {
        Self {
            intercepted: false,
            source: None,
            status: None,
            status_text: None,
            headers: Vec::new(),
            body: None,
            revalidating: false,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(orchestrator: &Orchestrator, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url must not be empty".into()).into());
    }

    let request = CacheRequest::parse(&params.method, &params.url)?.with_destination(params.destination);

    let output = match orchestrator.handle_fetch_with(&request, params.strategy).await? {
        Some(served) => SwFetchOutput {
            intercepted: true,
            source: Some(served.source),
            status: Some(served.response.status),
            status_text: Some(served.response.status_text.clone()),
            body: Some(served.response.body_text()),
            headers: served.response.headers,
            revalidating: served.revalidation.is_some(),
        },
        None => SwFetchOutput::passthrough(),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::output;
    use crate::worker::testing::orchestrator;
    use stratus_core::CachedResponse;

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), destination: Destination::Empty, strategy: None }
    }

    #[tokio::test]
    async fn test_fetch_then_hit() {
        let (orchestrator, fetcher, _host, _db) = orchestrator().await;
        let url = "http://localhost:5173/assets/app.js";
        fetcher.route(url, CachedResponse::new(200, "OK", "console.log(1)"));

        let first: SwFetchOutput = output(fetch_impl(&orchestrator, params(url)).await.unwrap());
        assert_eq!(first.source, Some(ResponseSource::Network));

        let second: SwFetchOutput = output(fetch_impl(&orchestrator, params(url)).await.unwrap());
        assert_eq!(second.source, Some(ResponseSource::Cache));
        assert_eq!(second.body.as_deref(), Some("console.log(1)"));
        assert!(second.headers.iter().any(|(k, _)| k == "sw-cache-date"));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_http_not_intercepted() {
        let (orchestrator, _fetcher, _host, _db) = orchestrator().await;
        let out: SwFetchOutput = output(fetch_impl(&orchestrator, params("data:text/plain,hi")).await.unwrap());
        assert!(!out.intercepted);
        assert!(out.status.is_none());
    }

    #[tokio::test]
    async fn test_source_serializes_lowercase() {
        let (orchestrator, fetcher, _host, _db) = orchestrator().await;
        fetcher.set_offline(true);
        let result = fetch_impl(&orchestrator, params("http://localhost:5173/assets/app.js")).await.unwrap();
        let raw: serde_json::Value = output(result);
        assert_eq!(raw["source"], "offline");
        assert_eq!(raw["status"], 503);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let (orchestrator, _fetcher, _host, _db) = orchestrator().await;
        let err = fetch_impl(&orchestrator, params("  ")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_cache_only_miss_is_error() {
        let (orchestrator, _fetcher, _host, _db) = orchestrator().await;
        let p = SwFetchParams { strategy: Some(Strategy::CacheOnly), ..params("http://localhost:5173/x.css") };
        assert!(fetch_impl(&orchestrator, p).await.is_err());
    }
}
