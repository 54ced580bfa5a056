//! sw_message tool implementation.
//!
//! Delivers a control-channel message and returns the reply, if any.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratus_core::Error;

use crate::worker::Orchestrator;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: SKIP_WAITING, GET_VERSION, CACHE_WEATHER_DATA,
    /// CLEAR_CACHE or GET_CACHED_CITIES. Unknown types are ignored.
    #[serde(rename = "type")]
    pub kind: String,

    /// Message payload (CACHE_WEATHER_DATA expects an object with `city`).
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Output structure for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// The reply posted back, or null when the message gets none.
    pub reply: Option<Value>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(orchestrator: &Orchestrator, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let mut raw = serde_json::Map::new();
    raw.insert("type".into(), Value::String(params.kind));
    if let Some(payload) = params.payload {
        raw.insert("payload".into(), payload);
    }

    let reply = orchestrator
        .on_message(&Value::Object(raw))
        .await?
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;

    let json = serde_json::to_string_pretty(&SwMessageOutput { reply })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
