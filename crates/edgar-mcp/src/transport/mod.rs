//! Transport Layer
//!
//! - Stdio: newline-delimited JSON-RPC with one implicit session
//! - HTTP+SSE: one session per open event stream, messages posted by id

mod http;
mod stdio;

pub use http::{router, HttpSseTransport};
pub use stdio::StdioTransport;

use crate::protocol::{McpRequest, McpResponse};
use crate::registry::ToolDescriptor;
use crate::session::Session;
use anyhow::Result;
use std::sync::Arc;

/// Generic MCP server trait for transport layer
#[async_trait::async_trait]
pub trait McpHandler: Send + Sync {
    /// `None` for notifications.
    async fn handle_request(&self, session: &Arc<Session>, request: McpRequest) -> Option<McpResponse>;

    /// Tool catalog, as `tools/list` reports it.
    fn list_tools(&self) -> Vec<ToolDescriptor>;
}

/// Transport trait - implement for new transport types
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()>;
}

#[async_trait::async_trait]
impl McpHandler for crate::McpServer {
    async fn handle_request(&self, session: &Arc<Session>, request: McpRequest) -> Option<McpResponse> {
        crate::McpServer::handle_request(self, session, request).await
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry().describe()
    }
}
