//! Caching strategies over the bucket store.
//!
//! ### Semantics
//! - cache-first: stored entry wins; on a miss the network response is
//!   returned and, when 2xx, stored. A failed fetch yields the offline 503.
//! - network-first: a 2xx network response is stored and returned. When
//!   the fetch fails the stored entry is served, then the offline weather
//!   placeholder for `api` requests; anything else surfaces the failure.
//! - stale-while-revalidate: a stored entry is returned at once while a
//!   spawned task refreshes it; on a miss the caller waits for the network.
//! - network-only never touches the store, cache-only never touches the
//!   network.
//!
//! Every write goes through [`Executor::store`], which stamps
//! `sw-cache-date` on policy-bearing buckets and skips non-GET requests.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stratus_client::Fetcher;
use stratus_core::{BucketKind, CacheDb, CacheRequest, CacheSettings, CachedResponse, Error, Strategy, now_ms};
use tokio::task::JoinHandle;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthesized locally because neither cache nor network could answer.
    Offline,
}

/// A response handed back to the page.
#[derive(Debug)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ResponseSource,
    /// Background refresh started by stale-while-revalidate.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: CachedResponse, source: ResponseSource) -> Self {
        Self { response, source, revalidation: None }
    }
}

/// Runs a strategy for a request against one bucket.
#[derive(Clone)]
pub struct Executor {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    settings: Arc<CacheSettings>,
}

impl Executor {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, settings: Arc<CacheSettings>) -> Self {
        Self { db, fetcher, settings }
    }

    pub async fn execute(&self, strategy: Strategy, request: &CacheRequest, bucket: BucketKind) -> Result<Served, Error> {
        tracing::debug!(url = %request.url, %strategy, %bucket, "executing strategy");
        match strategy {
            Strategy::CacheFirst => self.cache_first(request, bucket).await,
            Strategy::NetworkFirst => self.network_first(request, bucket).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, bucket).await,
            Strategy::NetworkOnly => self.network_only(request).await,
            Strategy::CacheOnly => self.cache_only(request, bucket).await,
        }
    }

    /// Stored response for `request` in `bucket`. Only GET requests can match.
    pub async fn lookup(&self, request: &CacheRequest, bucket: BucketKind) -> Result<Option<CachedResponse>, Error> {
        if !request.is_storable() {
            return Ok(None);
        }
        self.db.match_entry(&self.settings.bucket_name(bucket), &request.key()).await
    }

    /// Write `response` under `request` in `bucket`.
    ///
    /// Returns false when the request method cannot be stored.
    pub async fn store(&self, request: &CacheRequest, bucket: BucketKind, response: &CachedResponse) -> Result<bool, Error> {
        if !request.is_storable() {
            tracing::debug!(method = %request.method, url = %request.url, "not storing non-GET response");
            return Ok(false);
        }

        let entry = match self.settings.policy(bucket) {
            Some(_) => response.stamped(now_ms()),
            None => response.clone(),
        };
        self.db.put_entry(&self.settings.bucket_name(bucket), &request.key(), &entry).await?;
        tracing::debug!(url = %request.url, %bucket, "stored response");
        Ok(true)
    }

    /// Store a fresh network response; a failed write does not fail the fetch.
    async fn store_fresh(&self, request: &CacheRequest, bucket: BucketKind, response: &CachedResponse) {
        if !response.is_success() {
            return;
        }
        if let Err(e) = self.store(request, bucket, response).await {
            tracing::warn!(url = %request.url, %bucket, error = %e, "failed to store network response");
        }
    }

    async fn cache_first(&self, request: &CacheRequest, bucket: BucketKind) -> Result<Served, Error> {
        if let Some(cached) = self.lookup(request, bucket).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(Served::new(cached, ResponseSource::Cache));
        }

        tracing::debug!(url = %request.url, "cache miss");
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_fresh(request, bucket, &response).await;
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed, no cached version");
                Ok(Served::new(CachedResponse::offline_unavailable(), ResponseSource::Offline))
            }
        }
    }

    async fn network_first(&self, request: &CacheRequest, bucket: BucketKind) -> Result<Served, Error> {
        let err = match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_fresh(request, bucket, &response).await;
                return Ok(Served::new(response, ResponseSource::Network));
            }
            Err(e) => e,
        };

        tracing::info!(url = %request.url, error = %err, "network failed, trying cache");
        if let Some(cached) = self.lookup(request, bucket).await? {
            return Ok(Served::new(cached, ResponseSource::Cache));
        }

        if bucket == BucketKind::Api {
            return Ok(Served::new(CachedResponse::offline_weather(), ResponseSource::Offline));
        }

        Err(err)
    }

    async fn stale_while_revalidate(&self, request: &CacheRequest, bucket: BucketKind) -> Result<Served, Error> {
        let Some(cached) = self.lookup(request, bucket).await? else {
            let response = self.fetcher.fetch(request).await?;
            self.store_fresh(request, bucket, &response).await;
            return Ok(Served::new(response, ResponseSource::Network));
        };

        let executor = self.clone();
        let request = request.clone();
        let revalidation = tokio::spawn(async move {
            match executor.fetcher.fetch(&request).await {
                Ok(response) => executor.store_fresh(&request, bucket, &response).await,
                Err(e) => tracing::warn!(url = %request.url, error = %e, "background revalidation failed"),
            }
        });

        Ok(Served { response: cached, source: ResponseSource::Cache, revalidation: Some(revalidation) })
    }

    async fn network_only(&self, request: &CacheRequest) -> Result<Served, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(Served::new(response, ResponseSource::Network)),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network-only fetch failed");
                Ok(Served::new(CachedResponse::offline_unavailable(), ResponseSource::Offline))
            }
        }
    }

    async fn cache_only(&self, request: &CacheRequest, bucket: BucketKind) -> Result<Served, Error> {
        self.lookup(request, bucket)
            .await?
            .map(|cached| Served::new(cached, ResponseSource::Cache))
            .ok_or_else(|| Error::CacheMiss(request.url.to_string()))
    }
}
