//! MCP server handler implementation.
//!
//! This module defines the server handler that routes tool calls to the
//! orchestrator's event handlers.

use std::sync::Arc;

use crate::tools::{
    SwFetchParams, SwMessageParams, SwNotificationClickParams, SwPushParams, SwSweepParams, SwSyncParams, events,
    fetch::fetch_impl, message::message_impl,
};
use crate::worker::Orchestrator;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for stratus-sw.
#[derive(Clone)]
pub struct SwServer {
    orchestrator: Arc<Orchestrator>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Route a request through the cache orchestrator as if a page issued it. Returns the response and whether it came from cache, network or an offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.orchestrator, params.0).await
    }

    #[tool(
        description = "Send a control message (SKIP_WAITING, GET_VERSION, CACHE_WEATHER_DATA, CLEAR_CACHE, GET_CACHED_CITIES) and return the reply, if any."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Fire a background sync: 'weather-update' refreshes cached cities, 'cache-cleanup' runs eviction.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        events::sync_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Deliver a push message and show the resulting notification.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        events::push_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Simulate a notification click: focus an open page or open a new window.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        events::notification_click_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Run the eviction sweeper now, or as of a given epoch-millisecond time.")]
    async fn sw_sweep(&self, params: Parameters<SwSweepParams>) -> Result<CallToolResult, McpError> {
        events::sweep_impl(&self.orchestrator, params.0).await
    }
}

impl ServerHandler for SwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "stratus-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
