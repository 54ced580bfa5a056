//! Serialized HTTP responses as stored in a bucket.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Synthetic header holding the write time in epoch milliseconds.
pub const CACHE_DATE_HEADER: &str = "sw-cache-date";

/// Status, headers and body of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedResponse {
    pub status: u16,
    pub status_text: String,
    /// Header pairs in received order; names are stored lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: status_text.into(), headers: Vec::new(), body: body.into() }
    }

    /// A 200 JSON response.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, "OK", value.to_string()).with_header("content-type", "application/json")
    }

    /// The 503 served when neither cache nor network can answer.
    pub fn offline_unavailable() -> Self {
        Self::new(503, "Service Unavailable", "Offline - No cached version available")
            .with_header("content-type", "text/plain;charset=UTF-8")
    }

    /// Placeholder weather payload for API requests made while offline.
    pub fn offline_weather() -> Self {
        Self::json(&serde_json::json!({
            "name": "Offline",
            "weather": [{ "description": "Dati non disponibili offline" }],
            "main": { "temp": "--", "humidity": "--", "pressure": "--" },
            "wind": { "speed": "--" },
            "visibility": "--",
        }))
    }

    /// 2xx-class status, the fetch API's `response.ok`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Set a header, replacing any existing value (names are case-insensitive).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| *k != name);
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Copy of this response carrying a write timestamp.
    pub fn stamped(&self, now_ms: i64) -> Self {
        self.clone().with_header(CACHE_DATE_HEADER, now_ms.to_string())
    }

    /// Write timestamp, if present and parseable.
    pub fn cache_date(&self) -> Option<i64> {
        self.header(CACHE_DATE_HEADER)?.trim().parse().ok()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_round_trip() {
        let response = CachedResponse::new(200, "OK", "hello");
        assert_eq!(response.cache_date(), None);
        let stamped = response.stamped(1_700_000_000_000);
        assert_eq!(stamped.cache_date(), Some(1_700_000_000_000));
        assert_eq!(stamped.header("SW-Cache-Date"), Some("1700000000000"));
    }

    #[test]
    fn test_restamp_replaces() {
        let stamped = CachedResponse::new(200, "OK", "x").stamped(1).stamped(2);
        assert_eq!(stamped.cache_date(), Some(2));
        assert_eq!(stamped.headers.iter().filter(|(k, _)| k == CACHE_DATE_HEADER).count(), 1);
    }

    #[test]
    fn test_unparseable_stamp() {
        let response = CachedResponse::new(200, "OK", "x").with_header(CACHE_DATE_HEADER, "yesterday");
        assert_eq!(response.cache_date(), None);
    }

    #[test]
    fn test_offline_weather_shape() {
        let response = CachedResponse::offline_weather();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body = response.body_json().unwrap();
        assert_eq!(body["name"], "Offline");
        assert_eq!(body["main"]["temp"], "--");
        assert_eq!(body["wind"]["speed"], "--");
    }

    #[test]
    fn test_offline_unavailable() {
        let response = CachedResponse::offline_unavailable();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
        assert_eq!(response.body_text(), "Offline - No cached version available");
    }
}
