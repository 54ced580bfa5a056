//! Request classification: which bucket, which strategy.
//!
//! Classification is a pure function of the request and the immutable
//! [`CacheSettings`], so the bucket chosen at write time is re-derived
//! identically at read and eviction time.

use std::sync::Arc;

use serde::Serialize;

use crate::policy::{BucketKind, CacheSettings, Strategy};
use crate::request::{CacheRequest, Destination};

/// Outcome of classifying an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub bucket: BucketKind,
    pub strategy: Strategy,
}

/// Maps requests onto buckets and strategies.
#[derive(Debug, Clone)]
pub struct Classifier {
    settings: Arc<CacheSettings>,
}

impl Classifier {
    pub fn new(settings: Arc<CacheSettings>) -> Self {
        Self { settings }
    }

    /// Classify a request.
    ///
    /// Returns `None` for non-http(s) requests, which are passed through
    /// without interception. Rules, first match wins:
    /// 1. weather-provider API prefix → `api`
    /// 2. image destination → `images`
    /// 3. anything else → `static`
    pub fn classify(&self, request: &CacheRequest) -> Option<Classification> {
        if !request.is_http() {
            return None;
        }

        let bucket = if self.settings.is_api_url(&request.url) {
            BucketKind::Api
        } else if request.destination == Destination::Image {
            BucketKind::Images
        } else {
            BucketKind::Static
        };

        let strategy = self.settings.policy(bucket).map(|p| p.strategy).unwrap_or_default();

        Some(Classification { bucket, strategy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Generation, PolicyTable};
    use url::Url;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(CacheSettings {
            generation: Generation::new("v10.0.0"),
            policies: PolicyTable::default(),
            api_prefixes: vec![
                "https://api.openweathermap.org/data/2.5/".into(),
                "https://api.openweathermap.org/data/3.0/".into(),
            ],
            origin: Url::parse("http://localhost:5173").unwrap(),
        }))
    }

    fn request(url: &str, destination: Destination) -> CacheRequest {
        CacheRequest::parse("GET", url).unwrap().with_destination(destination)
    }

    #[test]
    fn test_api_prefix_wins_over_destination() {
        let c = classifier();
        let req = request("https://api.openweathermap.org/data/2.5/weather?q=Milano", Destination::Image);
        assert_eq!(c.classify(&req), Some(Classification { bucket: BucketKind::Api, strategy: Strategy::NetworkFirst }));

        let req = request("https://api.openweathermap.org/data/3.0/onecall?lat=1&lon=2", Destination::Empty);
        assert_eq!(c.classify(&req).map(|c| c.bucket), Some(BucketKind::Api));
    }

    #[test]
    fn test_other_provider_paths_are_not_api() {
        let c = classifier();
        let req = request("https://api.openweathermap.org/geo/1.0/direct?q=Milano", Destination::Empty);
        assert_eq!(c.classify(&req).map(|c| c.bucket), Some(BucketKind::Static));
    }

    #[test]
    fn test_images() {
        let c = classifier();
        let req = request("https://openweathermap.org/img/wn/10d@2x.png", Destination::Image);
        assert_eq!(
            c.classify(&req),
            Some(Classification { bucket: BucketKind::Images, strategy: Strategy::CacheFirst })
        );
    }

    #[test]
    fn test_default_is_static() {
        let c = classifier();
        let req = request("http://localhost:5173/assets/index.js", Destination::Script);
        assert_eq!(
            c.classify(&req),
            Some(Classification { bucket: BucketKind::Static, strategy: Strategy::CacheFirst })
        );
    }

    #[test]
    fn test_non_http_passes_through() {
        let c = classifier();
        assert_eq!(c.classify(&request("chrome-extension://abcdef/content.js", Destination::Script)), None);
        assert_eq!(c.classify(&request("data:text/plain,hello", Destination::Empty)), None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let reqs = [
            request("https://api.openweathermap.org/data/2.5/forecast?q=Roma", Destination::Empty),
            request("http://localhost:5173/vite.svg", Destination::Image),
            request("http://localhost:5173/", Destination::Document),
        ];
        let first: Vec<_> = reqs.iter().map(|r| c.classify(r)).collect();
        for _ in 0..3 {
            let again: Vec<_> = reqs.iter().rev().map(|r| c.classify(r)).collect();
            assert_eq!(again.into_iter().rev().collect::<Vec<_>>(), first);
        }
    }
}
