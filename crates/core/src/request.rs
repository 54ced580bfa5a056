//! Intercepted requests and their normalized cache identity.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// Resource type the page asked for (the fetch API's `request.destination`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    #[serde(alias = "")]
    Empty,
    Document,
    Script,
    Style,
    Font,
    Image,
    Manifest,
    Other,
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "empty" => Ok(Destination::Empty),
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "image" => Ok(Destination::Image),
            "manifest" => Ok(Destination::Manifest),
            "other" => Ok(Destination::Other),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// An outgoing request seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl CacheRequest {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url, destination: Destination::Empty }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Parse a request from loose host input.
    ///
    /// Any scheme is accepted here; deciding whether to intercept is the
    /// classifier's job.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl("empty URL".into()));
        }
        let url = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
        Ok(Self::new(method, url))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Only GET responses may be written to a bucket.
    pub fn is_storable(&self) -> bool {
        self.method == "GET"
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.method, &self.url)
    }
}

/// Normalized identity of a stored entry: method plus URL, query included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub hash: String,
    pub method: String,
    pub url: String,
}

impl EntryKey {
    /// Build a key, dropping the fragment. `Url` already lowercases the host.
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let method = method.trim().to_ascii_uppercase();
        let hash = compute_cache_key(&method, url.as_str());
        Self { hash, method, url: url.into() }
    }

    /// Value of a query parameter on the keyed URL.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
