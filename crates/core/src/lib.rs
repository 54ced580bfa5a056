//! Core types and shared functionality for stratus.
//!
//! This crate provides:
//! - Bucket store implementation with SQLite backend
//! - Bucket, generation and policy types
//! - Request classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod policy;
pub mod request;
pub mod response;

pub use cache::{CacheDb, StoredEntry};
pub use classify::{Classification, Classifier};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use policy::{BucketKind, CachePolicy, CacheSettings, Generation, PolicyTable, Strategy};
pub use request::{CacheRequest, Destination, EntryKey};
pub use response::{CACHE_DATE_HEADER, CachedResponse, now_ms};
