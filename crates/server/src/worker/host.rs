//! The hosting environment as seen by the orchestrator.
//!
//! Everything the orchestrator asks of its host (lifecycle promotion,
//! client control, notifications, windows) goes through [`Host`], so the
//! core stays a set of plain async functions.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;
use stratus_core::Error;
use tokio::sync::RwLock;
use url::Url;

use super::notify::Notification;

/// An open page controlled (or controllable) by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

/// Capabilities the orchestrator needs from its host.
#[async_trait::async_trait]
pub trait Host: Send + Sync {
    /// Promote a waiting version to active without waiting for old pages to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open in-scope page. Returns how many were claimed.
    async fn claim_clients(&self) -> Result<usize, Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error>;

    async fn focus_client(&self, id: &str) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<WindowClient, Error>;
}

/// Host for running without a browser: keeps windows and notifications in
/// memory and reports every request through tracing.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    clients: RwLock<Vec<WindowClient>>,
    notifications: RwLock<Vec<Notification>>,
    next_id: AtomicU64,
    claimed: AtomicUsize,
    promoted: AtomicBool,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> String {
        format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
impl HeadlessHost {
    /// Host with pre-existing open pages.
    pub fn with_clients(urls: &[&str]) -> Self {
        let clients = urls
            .iter()
            .enumerate()
            .map(|(i, url)| WindowClient { id: format!("client-{}", i + 1), url: (*url).to_string(), focused: false })
            .collect();
        Self { clients: RwLock::new(clients), next_id: AtomicU64::new(urls.len() as u64), ..Self::default() }
    }

    pub fn promoted(&self) -> bool {
        self.promoted.load(Ordering::Relaxed)
    }

    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::Relaxed)
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn clients(&self) -> Vec<WindowClient> {
        self.clients.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Host for HeadlessHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.promoted.store(true, Ordering::Relaxed);
        tracing::info!("promoted waiting version to active");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<usize, Error> {
        let count = self.clients.read().await.len();
        self.claimed.store(count, Ordering::Relaxed);
        tracing::info!(clients = count, "claimed open clients");
        Ok(count)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, tag = %notification.tag, "showing notification");
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.clients.read().await.clone())
    }

    async fn focus_client(&self, id: &str) -> Result<(), Error> {
        let mut clients = self.clients.write().await;
        if !clients.iter().any(|c| c.id == id) {
            return Err(Error::Host(format!("no such client: {id}")));
        }
        for client in clients.iter_mut() {
            client.focused = client.id == id;
        }
        tracing::debug!(client = id, "focused client");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<WindowClient, Error> {
        let client = WindowClient { id: self.allocate_id(), url: url.to_string(), focused: true };
        let mut clients = self.clients.write().await;
        for other in clients.iter_mut() {
            other.focused = false;
        }
        clients.push(client.clone());
        tracing::info!(url = %url, "opened window");
        Ok(client)
    }
}
