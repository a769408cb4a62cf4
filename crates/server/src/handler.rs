//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the lifecycle hooks.
use std::sync::Arc;

use crate::host::Host;
use crate::tools::activate::activate_impl;
use crate::tools::install::{InstallParams, install_impl};
use crate::tools::intercept::{InterceptParams, intercept_impl};

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

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler.
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    /// Install hook.
    #[tool(
        description = "Install a layer version: fetch the asset manifest into its generation, then activate it unless it must wait for the active version."
    )]
    async fn install(&self, params: Parameters<InstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host, params.0).await
    }

    /// Activate hook.
    #[tool(description = "Activate the waiting layer version, deleting every other generation.")]
    async fn activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    /// Intercept hook.
    #[tool(
        description = "Run one page request through the layer. Returns the response from cache, network, or the offline page."
    )]
    async fn intercept(&self, params: Parameters<InterceptParams>) -> Result<CallToolResult, McpError> {
        intercept_impl(&self.host, params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
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
