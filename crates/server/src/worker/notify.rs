//! Push messages and notification clicks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratus_core::Error;

use super::Orchestrator;

const ICON: &str = "/pwa-icons/icon-192x192.png";
const BADGE: &str = "/pwa-icons/badge-72x72.png";
const DEFAULT_TAG: &str = "weather-update";

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    fn new(action: &str, title: &str, icon: &str) -> Self {
        Self { action: action.into(), title: title.into(), icon: Some(icon.into()) }
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::new("open", "Apri App", "/pwa-icons/action-open.png"),
            Self::new("dismiss", "Ignora", "/pwa-icons/action-dismiss.png"),
        ]
    }
}

/// Payload of a push message, as sent by the push service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Opaque data handed back on click; `url` picks the page to open.
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub actions: Option<Vec<NotificationAction>>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub urgent: bool,
}

/// A notification ready to be shown by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
    pub icon: String,
    pub badge: String,
    pub image: Option<String>,
    pub data: Option<Value>,
    pub actions: Vec<NotificationAction>,
    pub tag: String,
    pub renotify: bool,
    pub require_interaction: bool,
    pub silent: bool,
    pub vibrate: Vec<u32>,
}

impl From<PushPayload> for Notification {
    fn from(payload: PushPayload) -> Self {
        let vibrate = if payload.urgent { vec![200, 100, 200] } else { vec![100, 50, 100] };
        Self {
            title: payload.title,
            body: payload.body,
            icon: ICON.into(),
            badge: BADGE.into(),
            image: payload.image,
            data: payload.data,
            actions: payload.actions.unwrap_or_else(NotificationAction::defaults),
            tag: payload.tag.unwrap_or_else(|| DEFAULT_TAG.into()),
            renotify: true,
            require_interaction: payload.urgent,
            silent: false,
            vibrate,
        }
    }
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClickOutcome {
    Dismissed,
    Focused { client_id: String },
    Opened { client_id: String, url: String },
}

impl Orchestrator {
    /// Show a notification for a push message. A push without payload is ignored.
    pub async fn on_push(&self, payload: Option<PushPayload>) -> Result<Option<Notification>, Error> {
        let Some(payload) = payload else {
            tracing::debug!("push without payload ignored");
            return Ok(None);
        };

        let notification = Notification::from(payload);
        self.host.show_notification(&notification).await?;
        Ok(Some(notification))
    }

    /// Handle a click on a notification or one of its actions.
    ///
    /// `dismiss` does nothing. Anything else focuses an open page on the
    /// origin, or opens `data.url` (default `/`) in a new window.
    pub async fn on_notification_click(&self, action: Option<&str>, data: Option<&Value>) -> Result<ClickOutcome, Error> {
        if action == Some("dismiss") {
            return Ok(ClickOutcome::Dismissed);
        }

        let origin = self.settings.origin.origin().ascii_serialization();
        let clients = self.host.window_clients().await?;
        if let Some(client) = clients.iter().find(|c| c.url.contains(&origin)) {
            self.host.focus_client(&client.id).await?;
            return Ok(ClickOutcome::Focused { client_id: client.id.clone() });
        }

        let target = data.and_then(|d| d.get("url")).and_then(Value::as_str).unwrap_or("/");
        let url = self
            .settings
            .origin
            .join(target)
            .map_err(|e| Error::InvalidUrl(format!("{target}: {e}")))?;
        let client = self.host.open_window(&url).await?;
        Ok(ClickOutcome::Opened { client_id: client.id, url: client.url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::worker::HeadlessHost;
    use crate::worker::testing::{MockFetcher, orchestrator, test_config};
    use serde_json::json;
    use stratus_core::CacheDb;

    #[test]
    fn test_notification_defaults() {
        let payload: PushPayload = serde_json::from_value(json!({ "title": "Allerta", "body": "Pioggia" })).unwrap();
        let notification = Notification::from(payload);

        assert_eq!(notification.icon, "/pwa-icons/icon-192x192.png");
        assert_eq!(notification.badge, "/pwa-icons/badge-72x72.png");
        assert_eq!(notification.tag, "weather-update");
        assert_eq!(notification.vibrate, vec![100, 50, 100]);
        assert!(!notification.require_interaction);
        assert!(notification.renotify);
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["open", "dismiss"]);
    }

    #[test]
    fn test_urgent_notification() {
        let payload = PushPayload { title: "Temporale".into(), urgent: true, tag: Some("storm".into()), ..Default::default() };
        let notification = Notification::from(payload);
        assert_eq!(notification.vibrate, vec![200, 100, 200]);
        assert!(notification.require_interaction);
        assert_eq!(notification.tag, "storm");
    }

    #[tokio::test]
    async fn test_on_push_shows_notification() {
        let (orchestrator, _fetcher, host, _db) = orchestrator().await;

        assert!(orchestrator.on_push(None).await.unwrap().is_none());
        assert!(host.notifications().await.is_empty());

        let payload = PushPayload { title: "Allerta".into(), ..Default::default() };
        orchestrator.on_push(Some(payload)).await.unwrap();
        let shown = host.notifications().await;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Allerta");
    }

    #[tokio::test]
    async fn test_click_dismiss_does_nothing() {
        let (orchestrator, _fetcher, host, _db) = orchestrator().await;
        let outcome = orchestrator.on_notification_click(Some("dismiss"), None).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Dismissed);
        assert!(host.clients().await.iter().all(|c| !c.focused));
    }

    #[tokio::test]
    async fn test_click_focuses_open_page() {
        let (orchestrator, _fetcher, host, _db) = orchestrator().await;
        let outcome = orchestrator.on_notification_click(Some("open"), None).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Focused { client_id: "client-1".into() });
        assert!(host.clients().await[0].focused);
    }

    #[tokio::test]
    async fn test_click_opens_window_when_no_page_is_open() {
        let host = Arc::new(HeadlessHost::new());
        let db = CacheDb::open_in_memory().await.unwrap();
        let orchestrator = Orchestrator::new(&test_config(), db, Arc::new(MockFetcher::new()), host.clone()).unwrap();

        let data = json!({ "url": "/?city=Roma" });
        let outcome = orchestrator.on_notification_click(None, Some(&data)).await.unwrap();
        assert!(matches!(&outcome, ClickOutcome::Opened { url, .. } if url == "http://localhost:5173/?city=Roma"));
        assert_eq!(host.clients().await.len(), 1);
    }
}
