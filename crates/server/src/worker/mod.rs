//! The request cache orchestrator.
//!
//! [`Orchestrator`] owns the immutable settings, the bucket store and the
//! network and host seams, and answers every event the host delivers:
//! install, activate, fetch, message, sync, push and notification click.
//! Each event is handled independently; the store serializes individual
//! key operations and nothing else is locked across events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stratus_client::{Fetcher, WeatherEndpoints};
use stratus_core::{AppConfig, CacheDb, CacheRequest, CacheSettings, Classifier, Error, Strategy};
use tokio::sync::RwLock;
use url::Url;

pub mod control;
pub mod host;
pub mod lifecycle;
pub mod notify;
pub mod strategy;
pub mod sweeper;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use host::{HeadlessHost, Host};
pub use lifecycle::LifecycleState;
pub use notify::PushPayload;
pub use strategy::{Executor, ResponseSource, Served};
pub use sweeper::{SweepReport, Sweeper};

pub struct Orchestrator {
    settings: Arc<CacheSettings>,
    classifier: Classifier,
    executor: Executor,
    sweeper: Sweeper,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn Host>,
    weather: Option<WeatherEndpoints>,
    app_shell: Vec<Url>,
    default_city: String,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
}

impl Orchestrator {
    /// Build an orchestrator from validated configuration.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` if the origin, app shell or weather base URL
    /// cannot be resolved.
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>) -> Result<Self, Error> {
        let settings = Arc::new(config.cache_settings().map_err(|e| Error::InvalidInput(e.to_string()))?);
        let app_shell = config.app_shell_urls().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let weather = WeatherEndpoints::from_config(config)?;

        Ok(Self {
            classifier: Classifier::new(settings.clone()),
            executor: Executor::new(db.clone(), fetcher.clone(), settings.clone()),
            sweeper: Sweeper::new(db.clone(), settings.clone()),
            settings,
            db,
            fetcher,
            host,
            weather,
            app_shell,
            default_city: config.default_city.clone(),
            state: RwLock::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, state: LifecycleState) {
        tracing::info!(state = %state, "lifecycle transition");
        *self.state.write().await = state;
    }

    /// Whether skip-waiting has been requested, by install or by a control message.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Ask the host to promote this version immediately.
    pub async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.host.skip_waiting().await
    }

    /// Answer an intercepted request with its classified strategy.
    ///
    /// Returns `Ok(None)` for requests that are not intercepted (non-http(s)).
    pub async fn handle_fetch(&self, request: &CacheRequest) -> Result<Option<Served>, Error> {
        self.handle_fetch_with(request, None).await
    }

    /// Like [`Orchestrator::handle_fetch`], optionally overriding the strategy.
    pub async fn handle_fetch_with(
        &self, request: &CacheRequest, strategy: Option<Strategy>,
    ) -> Result<Option<Served>, Error> {
        let Some(classification) = self.classifier.classify(request) else {
            tracing::debug!(url = %request.url, "not intercepting non-http request");
            return Ok(None);
        };

        let strategy = strategy.unwrap_or(classification.strategy);
        self.executor.execute(strategy, request, classification.bucket).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::orchestrator;
    use stratus_core::{CachedResponse, Destination};

    #[tokio::test]
    async fn test_non_http_is_passed_through() {
        let (orchestrator, fetcher, _host, _db) = orchestrator().await;
        let request = CacheRequest::parse("GET", "chrome-extension://abc/script.js").unwrap();
        assert!(orchestrator.handle_fetch(&request).await.unwrap().is_none());
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_image_request_lands_in_images_bucket() {
        let (orchestrator, fetcher, _host, db) = orchestrator().await;
        let url = "http://localhost:5173/icons/sun.png";
        fetcher.route(url, CachedResponse::new(200, "OK", "png"));

        let request = CacheRequest::parse("GET", url).unwrap().with_destination(Destination::Image);
        let served = orchestrator.handle_fetch(&request).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(db.entry_count("weather-images-vtest").await.unwrap(), 1);
        assert_eq!(db.entry_count("weather-static-vtest").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_strategy_override() {
        let (orchestrator, fetcher, _host, _db) = orchestrator().await;
        let url = "http://localhost:5173/index.html";
        let request = CacheRequest::parse("GET", url).unwrap();

        let result = orchestrator.handle_fetch_with(&request, Some(Strategy::CacheOnly)).await;
        assert!(matches!(result, Err(Error::CacheMiss(_))));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_api_request_gets_placeholder() {
        let (orchestrator, fetcher, _host, _db) = orchestrator().await;
        fetcher.set_offline(true);

        let request = CacheRequest::parse("GET", "https://api.openweathermap.org/data/2.5/weather?q=Roma").unwrap();
        let served = orchestrator.handle_fetch(&request).await.unwrap().unwrap();
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.body_json().unwrap()["name"], "Offline");
    }
}
