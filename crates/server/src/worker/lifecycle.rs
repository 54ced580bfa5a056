//! Install and activate.

use std::fmt;

use futures_util::future::try_join_all;
use serde::Serialize;
use stratus_core::{BucketKind, CacheRequest, CachedResponse, Error};
use url::Url;

use super::Orchestrator;

/// Where this version is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never take control.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// App-shell URLs written to the static bucket.
    pub precached: usize,
    /// Whether the default city's current weather and forecast were stored.
    pub prewarmed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Buckets of earlier generations that were deleted.
    pub deleted: Vec<String>,
    /// Buckets that could not be deleted.
    pub failed: Vec<String>,
    /// Open pages taken over.
    pub claimed: usize,
}

impl Orchestrator {
    /// Pre-cache the app shell and pre-warm the default city, then skip waiting.
    ///
    /// # Errors
    ///
    /// Fails, leaving the version redundant, when any app-shell URL cannot
    /// be fetched with a 2xx status or stored. Pre-warm failures only log.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(LifecycleState::Installing).await;

        let (precached, prewarmed) = tokio::join!(self.precache_app_shell(), self.prewarm_default_city());
        let precached = match precached {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "app shell pre-cache failed");
                self.set_state(LifecycleState::Redundant).await;
                return Err(e);
            }
        };

        self.set_state(LifecycleState::Installed).await;
        self.skip_waiting().await?;

        Ok(InstallReport { precached, prewarmed })
    }

    /// Fetch every app-shell URL, then store all of them. Nothing is stored
    /// unless every fetch succeeded.
    async fn precache_app_shell(&self) -> Result<usize, Error> {
        let requests: Vec<CacheRequest> = self.app_shell.iter().cloned().map(CacheRequest::get).collect();

        let responses = try_join_all(requests.iter().map(|request| async move {
            let response = self.fetcher.fetch(request).await?;
            if !response.is_success() {
                return Err(Error::HttpError(format!("{} returned {}", request.url, response.status)));
            }
            Ok::<_, Error>(response)
        }))
        .await?;

        for (request, response) in requests.iter().zip(&responses) {
            self.executor.store(request, BucketKind::Static, response).await?;
        }

        tracing::info!(count = requests.len(), "cached app shell");
        Ok(requests.len())
    }

    /// Best-effort: store the default city's weather and forecast only if both succeed.
    async fn prewarm_default_city(&self) -> bool {
        let Some(weather) = &self.weather else {
            tracing::warn!("no weather API key configured, skipping pre-warm");
            return false;
        };

        let urls = match (weather.current(&self.default_city), weather.forecast(&self.default_city)) {
            (Ok(current), Ok(forecast)) => [current, forecast],
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to build pre-warm URLs");
                return false;
            }
        };

        match self.prewarm(urls).await {
            Ok(true) => {
                tracing::info!(city = %self.default_city, "cached default weather data");
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::warn!(city = %self.default_city, error = %e, "failed to cache default weather data");
                false
            }
        }
    }

    async fn prewarm(&self, urls: [Url; 2]) -> Result<bool, Error> {
        let [current, forecast] = urls.map(CacheRequest::get);
        let (current_response, forecast_response) =
            tokio::try_join!(self.fetcher.fetch(&current), self.fetcher.fetch(&forecast))?;

        if !(current_response.is_success() && forecast_response.is_success()) {
            tracing::debug!(
                current = current_response.status,
                forecast = forecast_response.status,
                "pre-warm responses not ok, skipping"
            );
            return Ok(false);
        }

        let pairs: [(&CacheRequest, &CachedResponse); 2] = [(&current, &current_response), (&forecast, &forecast_response)];
        for (request, response) in pairs {
            self.executor.store(request, BucketKind::Api, response).await?;
        }
        Ok(true)
    }

    /// Drop earlier generations and take control of open pages.
    ///
    /// # Errors
    ///
    /// Store enumeration failures and host claim failures propagate; a bucket
    /// that cannot be deleted is only reported.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.set_state(LifecycleState::Activating).await;

        let (cleanup, claimed) = tokio::join!(self.cleanup_old_buckets(), self.host.claim_clients());
        let (deleted, failed) = cleanup?;
        let claimed = claimed?;

        self.set_state(LifecycleState::Activated).await;
        Ok(ActivateReport { deleted, failed, claimed })
    }

    async fn cleanup_old_buckets(&self) -> Result<(Vec<String>, Vec<String>), Error> {
        let generation = &self.settings.generation;
        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        for name in self.db.bucket_names().await? {
            if generation.owns(&name) {
                continue;
            }
            match self.db.delete_bucket(&name).await {
                Ok(_) => {
                    tracing::info!(bucket = %name, "deleted old bucket");
                    deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(bucket = %name, error = %e, "failed to delete old bucket");
                    failed.push(name);
                }
            }
        }

        for name in generation.bucket_names() {
            self.db.open_bucket(&name).await?;
        }

        Ok((deleted, failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{forecast_url, orchestrator, orchestrator_with, test_config, weather_url};
    use stratus_core::{AppConfig, CacheDb};

    fn ok(body: &str) -> CachedResponse {
        CachedResponse::new(200, "OK", body)
    }

    fn urls(keys: Vec<stratus_core::EntryKey>) -> Vec<String> {
        keys.into_iter().map(|k| k.url).collect()
    }

    #[tokio::test]
    async fn test_install_caches_shell_and_default_city() {
        let (orchestrator, fetcher, host, db) = orchestrator().await;
        fetcher.route("http://localhost:5173/", ok("root"));
        fetcher.route("http://localhost:5173/index.html", ok("index"));
        fetcher.route(&weather_url("Milano"), ok("{}"));
        fetcher.route(&forecast_url("Milano"), ok("{}"));

        let report = orchestrator.install().await.unwrap();
        assert_eq!(report, InstallReport { precached: 2, prewarmed: true });

        assert_eq!(
            urls(db.entry_keys("weather-static-vtest").await.unwrap()),
            vec!["http://localhost:5173/", "http://localhost:5173/index.html"]
        );
        assert_eq!(urls(db.entry_keys("weather-api-vtest").await.unwrap()), vec![weather_url("Milano"), forecast_url("Milano")]);

        assert_eq!(orchestrator.state().await, LifecycleState::Installed);
        assert!(orchestrator.skip_waiting_requested());
        assert!(host.promoted());
    }

    #[tokio::test]
    async fn test_install_survives_prewarm_failure() {
        let (orchestrator, fetcher, _host, db) = orchestrator().await;
        fetcher.route("http://localhost:5173/", ok("root"));
        fetcher.route("http://localhost:5173/index.html", ok("index"));
        fetcher.route(&weather_url("Milano"), ok("{}"));
        // forecast unrouted: 404

        let report = orchestrator.install().await.unwrap();
        assert!(!report.prewarmed);
        assert_eq!(db.entry_count("weather-api-vtest").await.unwrap(), 0);
        assert_eq!(db.entry_count("weather-static-vtest").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_install_without_api_key_skips_prewarm() {
        let config = AppConfig { weather_api_key: None, ..test_config() };
        let (orchestrator, fetcher, _host, _db) = orchestrator_with(config).await;
        fetcher.route("http://localhost:5173/", ok("root"));
        fetcher.route("http://localhost:5173/index.html", ok("index"));

        let report = orchestrator.install().await.unwrap();
        assert!(!report.prewarmed);
        assert!(fetcher.calls().iter().all(|url| url.starts_with("http://localhost:5173/")));
    }

    #[tokio::test]
    async fn test_install_fails_when_shell_is_missing() {
        let (orchestrator, fetcher, host, db) = orchestrator().await;
        fetcher.route("http://localhost:5173/", ok("root"));

        let result = orchestrator.install().await;
        assert!(matches!(result, Err(Error::HttpError(_))));
        assert_eq!(orchestrator.state().await, LifecycleState::Redundant);
        assert_eq!(db.entry_count("weather-static-vtest").await.unwrap(), 0);
        assert!(!host.promoted());
    }

    #[tokio::test]
    async fn test_activate_rolls_over_generations() {
        let (orchestrator, _fetcher, host, db) = orchestrator().await;
        let key = CacheRequest::parse("GET", "http://localhost:5173/").unwrap().key();
        db.put_entry("weather-static-v9.0.0", &key, &ok("old")).await.unwrap();
        db.put_entry("weather-api-v9.0.0", &key, &ok("old")).await.unwrap();
        db.put_entry("weather-static-vtest", &key, &ok("current")).await.unwrap();

        let report = orchestrator.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["weather-static-v9.0.0", "weather-api-v9.0.0"]);
        assert!(report.failed.is_empty());
        assert_eq!(report.claimed, 1);
        assert_eq!(host.claimed(), 1);

        let mut names = db.bucket_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["weather-api-vtest", "weather-app-vtest", "weather-images-vtest", "weather-static-vtest"]);
        assert_eq!(db.entry_count("weather-static-vtest").await.unwrap(), 1);
        assert_eq!(orchestrator.state().await, LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_activate_on_empty_store_creates_buckets() {
        let (orchestrator, _fetcher, _host, db) = orchestrator().await;
        orchestrator.activate().await.unwrap();
        for name in orchestrator.settings().generation.bucket_names() {
            assert!(db.has_bucket(&name).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_persistent_store_survives_restart() {
        let path = std::env::temp_dir().join(format!("stratus-lifecycle-{}.sqlite", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let db = CacheDb::open(&path).await.unwrap();
            db.put_entry("weather-api-v9.0.0", &CacheRequest::parse("GET", "http://localhost:5173/").unwrap().key(), &ok("x"))
                .await
                .unwrap();
        }

        let db = CacheDb::open(&path).await.unwrap();
        let orchestrator = Orchestrator::new(
            &test_config(),
            db.clone(),
            std::sync::Arc::new(crate::worker::testing::MockFetcher::new()),
            std::sync::Arc::new(crate::worker::HeadlessHost::new()),
        )
        .unwrap();
        let report = orchestrator.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["weather-api-v9.0.0"]);

        let _ = std::fs::remove_file(&path);
    }
}
