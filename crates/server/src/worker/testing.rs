//! Test doubles and fixtures for the orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use stratus_client::Fetcher;
use stratus_core::{AppConfig, CacheDb, CacheRequest, CacheSettings, CachedResponse, Error};
use url::Url;

use super::{HeadlessHost, Orchestrator};

/// Fetcher answering from a fixed route table. Unknown URLs get a 404;
/// an offline fetcher fails every request like a dropped connection.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, CachedResponse>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: CachedResponse) {
        let key = Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string());
        self.routes.lock().unwrap().insert(key, response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| CachedResponse::new(404, "Not Found", "")))
    }
}

/// Configuration with generation `vtest`, a two-entry app shell and an API key.
pub fn test_config() -> AppConfig {
    AppConfig {
        cache_version: "vtest".into(),
        app_shell: vec!["/".into(), "/index.html".into()],
        weather_api_key: Some("test-key".into()),
        sweep_interval_secs: 0,
        ..Default::default()
    }
}

pub fn test_settings() -> CacheSettings {
    test_config().cache_settings().unwrap()
}

/// Current-weather URL the orchestrator builds for `city` under [`test_config`].
pub fn weather_url(city: &str) -> String {
    format!("https://api.openweathermap.org/data/2.5/weather?q={city}&appid=test-key&units=metric&lang=it")
}

pub fn forecast_url(city: &str) -> String {
    format!("https://api.openweathermap.org/data/2.5/forecast?q={city}&appid=test-key&units=metric&lang=it")
}

/// Orchestrator over an in-memory store, a [`MockFetcher`] and a headless
/// host with one open page on the origin.
pub async fn orchestrator() -> (Orchestrator, Arc<MockFetcher>, Arc<HeadlessHost>, CacheDb) {
    orchestrator_with(test_config()).await
}

pub async fn orchestrator_with(config: AppConfig) -> (Orchestrator, Arc<MockFetcher>, Arc<HeadlessHost>, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let host = Arc::new(HeadlessHost::with_clients(&["http://localhost:5173/"]));
    let orchestrator = Orchestrator::new(&config, db.clone(), fetcher.clone(), host.clone()).unwrap();
    (orchestrator, fetcher, host, db)
}
