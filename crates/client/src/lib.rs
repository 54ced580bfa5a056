//! Client code for stratus.
//!
//! This crate provides the network side of the orchestrator: the `Fetcher`
//! seam, its reqwest implementation, and the weather provider endpoints.

pub mod fetch;
pub mod weather;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use weather::WeatherEndpoints;
