//! Event tools: sw_sync, sw_push, sw_notification_click and sw_sweep.
//!
//! Each one dispatches a single host event to the orchestrator and reports
//! what it did.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stratus_core::Error;

use crate::worker::{Orchestrator, PushPayload};

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag: "weather-update" or "cache-cleanup". Other tags are ignored.
    pub tag: String,
}

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload; omit to simulate a push without data.
    #[serde(default)]
    pub payload: Option<PushPayload>,
}

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// The clicked action ("open", "dismiss"), or none for the notification body.
    #[serde(default)]
    pub action: Option<String>,

    /// The notification's data; `url` selects the page to open.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Input parameters for the sw_sweep tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwSweepParams {
    /// Sweep as of this epoch-millisecond time instead of now.
    #[serde(default)]
    pub now_ms: Option<i64>,
}

fn to_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn sync_impl(orchestrator: &Orchestrator, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(Error::InvalidInput("tag must not be empty".into()).into());
    }
    to_result(&orchestrator.on_sync(params.tag.trim()).await?)
}

pub async fn push_impl(orchestrator: &Orchestrator, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let shown = orchestrator.on_push(params.payload).await?;
    to_result(&serde_json::json!({ "notification": shown }))
}

pub async fn notification_click_impl(
    orchestrator: &Orchestrator, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = orchestrator
        .on_notification_click(params.action.as_deref(), params.data.as_ref())
        .await?;
    to_result(&outcome)
}

pub async fn sweep_impl(orchestrator: &Orchestrator, params: SwSweepParams) -> Result<CallToolResult, McpError> {
    let report = match params.now_ms {
        Some(now_ms) if now_ms < 0 => {
            return Err(Error::InvalidInput(format!("now_ms must not be negative: {now_ms}")).into());
        }
        Some(now_ms) => orchestrator.sweeper().sweep_at(now_ms).await?,
        None => orchestrator.sweeper().sweep().await?,
    };
    to_result(&report)
}
