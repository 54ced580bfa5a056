//! Background sync.

use serde::Serialize;
use stratus_core::{BucketKind, CacheRequest, Error};

use super::{Orchestrator, SweepReport};

pub const WEATHER_UPDATE_TAG: &str = "weather-update";
pub const CACHE_CLEANUP_TAG: &str = "cache-cleanup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "kebab-case")]
pub enum SyncOutcome {
    WeatherUpdate { refreshed: Vec<String>, failed: Vec<String> },
    CacheCleanup { report: SweepReport },
    Ignored,
}

impl Orchestrator {
    /// Run the background work registered under `tag`. Unknown tags are ignored.
    pub async fn on_sync(&self, tag: &str) -> Result<SyncOutcome, Error> {
        tracing::info!(tag, "background sync");
        match tag {
            WEATHER_UPDATE_TAG => self.refresh_cached_cities().await,
            CACHE_CLEANUP_TAG => Ok(SyncOutcome::CacheCleanup { report: self.sweeper.sweep().await? }),
            _ => {
                tracing::debug!(tag, "ignoring unknown sync tag");
                Ok(SyncOutcome::Ignored)
            }
        }
    }

    /// Re-fetch current weather for every cached city.
    async fn refresh_cached_cities(&self) -> Result<SyncOutcome, Error> {
        let mut refreshed = Vec::new();
        let mut failed = Vec::new();

        let Some(weather) = &self.weather else {
            tracing::warn!("no weather API key configured, skipping weather update");
            return Ok(SyncOutcome::WeatherUpdate { refreshed, failed });
        };

        for city in self.cached_cities().await? {
            match self.refresh_city(weather, &city).await {
                Ok(true) => refreshed.push(city),
                Ok(false) => failed.push(city),
                Err(e) => {
                    tracing::warn!(city = %city, error = %e, "failed to update weather");
                    failed.push(city);
                }
            }
        }

        Ok(SyncOutcome::WeatherUpdate { refreshed, failed })
    }

    async fn refresh_city(&self, weather: &stratus_client::WeatherEndpoints, city: &str) -> Result<bool, Error> {
        let request = CacheRequest::get(weather.current(city)?);
        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            tracing::warn!(city, status = response.status, "weather update returned an error status");
            return Ok(false);
        }
        self.executor.store(&request, BucketKind::Api, &response).await
    }
}
