//! MCP tool implementations.
//!
//! Each tool delivers one host event to the orchestrator: a page fetch, a
//! control message, a sync, a push, a notification click or a sweep.

pub mod events;
pub mod fetch;
pub mod message;

pub use events::{SwNotificationClickParams, SwPushParams, SwSweepParams, SwSyncParams};
pub use fetch::SwFetchParams;
pub use message::SwMessageParams;
