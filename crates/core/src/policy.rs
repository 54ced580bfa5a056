//! Buckets, generations and per-bucket cache policy.
//!
//! A generation is the version tag baked into every bucket name. The set of
//! buckets belonging to the running generation is a total function of
//! [`BucketKind`], so rollover never relies on string prefix conventions.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Prefix shared by every bucket name.
const BUCKET_PREFIX: &str = "weather";

/// Caching algorithm applied to an intercepted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    #[default]
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkOnly,
    CacheOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::NetworkOnly => "network-only",
            Strategy::CacheOnly => "cache-only",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four buckets of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Umbrella,
    Static,
    Api,
    Images,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [BucketKind::Umbrella, BucketKind::Static, BucketKind::Api, BucketKind::Images];

    fn label(&self) -> &'static str {
        match self {
            BucketKind::Umbrella => "app",
            BucketKind::Static => "static",
            BucketKind::Api => "api",
            BucketKind::Images => "images",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Version tag of the running build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation(String);

impl Generation {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store name of `kind` in this generation, e.g. `weather-api-v10.0.0`.
    pub fn bucket_name(&self, kind: BucketKind) -> String {
        format!("{BUCKET_PREFIX}-{}-{}", kind.label(), self.0)
    }

    /// Names of all four buckets of this generation.
    pub fn bucket_names(&self) -> Vec<String> {
        BucketKind::ALL.iter().map(|kind| self.bucket_name(*kind)).collect()
    }

    /// Inverse of [`Generation::bucket_name`] for this generation only.
    pub fn kind_of(&self, name: &str) -> Option<BucketKind> {
        BucketKind::ALL.into_iter().find(|kind| self.bucket_name(*kind) == name)
    }

    pub fn owns(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }
}

/// Static per-bucket policy. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachePolicy {
    pub strategy: Strategy,
    pub max_age_ms: i64,
    pub max_entries: usize,
}

impl CachePolicy {
    pub const fn new(strategy: Strategy, max_age_ms: i64, max_entries: usize) -> Self {
        Self { strategy, max_age_ms, max_entries }
    }

    /// Static assets: 30 days, 100 entries.
    pub const fn static_assets() -> Self {
        Self::new(Strategy::CacheFirst, 30 * 24 * 60 * 60 * 1000, 100)
    }

    /// Weather API responses: 10 minutes, 50 entries.
    pub const fn api() -> Self {
        Self::new(Strategy::NetworkFirst, 10 * 60 * 1000, 50)
    }

    /// Images: 7 days, 200 entries.
    pub const fn images() -> Self {
        Self::new(Strategy::CacheFirst, 7 * 24 * 60 * 60 * 1000, 200)
    }

    /// An age that does not fit in `i64` is never expired.
    pub fn is_expired(&self, stamped_at_ms: i64, now_ms: i64) -> bool {
        now_ms
            .checked_sub(stamped_at_ms)
            .is_some_and(|age| age > self.max_age_ms)
    }
}

/// Policies of the three resource classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "CachePolicy::static_assets")]
    pub static_assets: CachePolicy,
    #[serde(default = "CachePolicy::api")]
    pub api: CachePolicy,
    #[serde(default = "CachePolicy::images")]
    pub images: CachePolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self { static_assets: CachePolicy::static_assets(), api: CachePolicy::api(), images: CachePolicy::images() }
    }
}

impl PolicyTable {
    /// Policy of a bucket. The umbrella bucket carries none.
    pub fn for_kind(&self, kind: BucketKind) -> Option<&CachePolicy> {
        match kind {
            BucketKind::Umbrella => None,
            BucketKind::Static => Some(&self.static_assets),
            BucketKind::Api => Some(&self.api),
            BucketKind::Images => Some(&self.images),
        }
    }
}

/// Immutable configuration shared by every orchestrator component.
///
/// Built once at startup from `AppConfig` and handed out behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub generation: Generation,
    pub policies: PolicyTable,
    /// URL prefixes of the weather provider's REST endpoints.
    pub api_prefixes: Vec<String>,
    /// Origin the app shell and synthetic keys are resolved against.
    pub origin: Url,
}

impl CacheSettings {
    pub fn bucket_name(&self, kind: BucketKind) -> String {
        self.generation.bucket_name(kind)
    }

    pub fn policy(&self, kind: BucketKind) -> Option<&CachePolicy> {
        self.policies.for_kind(kind)
    }

    /// Whether `url` targets the weather provider.
    pub fn is_api_url(&self, url: &Url) -> bool {
        let href = url.as_str();
        self.api_prefixes.iter().any(|prefix| href.starts_with(prefix.as_str()))
    }

    /// Identifier replied to `GET_VERSION`.
    pub fn version(&self) -> String {
        self.bucket_name(BucketKind::Umbrella)
    }
}
