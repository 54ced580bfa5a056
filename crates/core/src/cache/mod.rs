//! SQLite-backed bucket store for intercepted responses.
//!
//! This module provides a persistent, origin-scoped key-value store using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named buckets, created on first open or first write
//! - Entries keyed by a SHA-256 digest of the request identity
//! - Stamp-aware compare-and-delete for the eviction sweeper
//! - Count-based trimming, oldest write first
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredEntry;
