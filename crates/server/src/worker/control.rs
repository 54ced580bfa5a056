//! Message channel from the foreground app.
//!
//! Messages are `{"type": ..., "payload": ...}` objects. Anything that does
//! not parse as a known message is ignored without a reply.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratus_core::{BucketKind, CacheRequest, CachedResponse, Error};

use super::Orchestrator;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    GetVersion,
    /// Store the payload as offline weather data for `payload.city`.
    CacheWeatherData(Value),
    ClearCache,
    GetCachedCities,
}

impl ControlMessage {
    /// Parse a raw message, returning None for unknown or malformed ones.
    pub fn parse(raw: &Value) -> Option<Self> {
        match serde_json::from_value(raw.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring control message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ControlReply {
    Version { version: String },
    Cleared { success: bool },
    Cities { cities: Vec<String> },
}

impl Orchestrator {
    /// Handle a raw control message; `Ok(None)` means no reply is sent.
    pub async fn on_message(&self, raw: &Value) -> Result<Option<ControlReply>, Error> {
        let Some(message) = ControlMessage::parse(raw) else {
            return Ok(None);
        };

        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting().await?;
                Ok(None)
            }
            ControlMessage::GetVersion => Ok(Some(ControlReply::Version { version: self.settings.version() })),
            ControlMessage::CacheWeatherData(payload) => {
                self.cache_weather_data(&payload).await?;
                Ok(None)
            }
            ControlMessage::ClearCache => {
                self.clear_all().await?;
                Ok(Some(ControlReply::Cleared { success: true }))
            }
            ControlMessage::GetCachedCities => Ok(Some(ControlReply::Cities { cities: self.cached_cities().await? })),
        }
    }

    /// Store `payload` in the api bucket under `{origin}/offline-weather/{city}`.
    pub async fn cache_weather_data(&self, payload: &Value) -> Result<(), Error> {
        let Some(city) = payload.get("city").and_then(Value::as_str) else {
            tracing::warn!("weather data without a city, not caching");
            return Ok(());
        };

        let mut url = self.settings.origin.clone();
        url.set_path(&format!("/offline-weather/{city}"));
        url.set_query(None);

        let request = CacheRequest::get(url);
        self.executor.store(&request, BucketKind::Api, &CachedResponse::json(payload)).await?;
        tracing::debug!(city, "cached offline weather data");
        Ok(())
    }

    /// Delete every stored bucket, current generation included.
    ///
    /// Every bucket is attempted; the first failure is returned afterwards.
    pub async fn clear_all(&self) -> Result<usize, Error> {
        let mut cleared = 0;
        let mut first_error = None;

        for name in self.db.bucket_names().await? {
            match self.db.delete_bucket(&name).await {
                Ok(_) => cleared += 1,
                Err(e) => {
                    tracing::warn!(bucket = %name, error = %e, "failed to delete bucket");
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(buckets = cleared, "cleared all buckets");
        match first_error {
            Some(e) => Err(e),
            None => Ok(cleared),
        }
    }

    /// Distinct `q` query values of the api bucket's keys, first-seen order.
    pub async fn cached_cities(&self) -> Result<Vec<String>, Error> {
        let keys = self.db.entry_keys(&self.settings.bucket_name(BucketKind::Api)).await?;

        let mut cities: Vec<String> = Vec::new();
        for city in keys.iter().filter_map(|key| key.query_param("q")) {
            if !city.is_empty() && !cities.contains(&city) {
                cities.push(city);
            }
        }
        Ok(cities)
    }
}
