//! Stdio Transport
//!
//! Standard MCP transport over stdin/stdout. The process is the session:
//! events are logged rather than pushed.

use super::{McpHandler, Transport};
use crate::events::{DomainEvent, EventKind};
use crate::protocol::{JsonRpcError, McpRequest, McpResponse};
use crate::session::SessionTable;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// Stdio transport - reads JSON-RPC from stdin, writes to stdout
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::ResourceUpdate { uri } => info!(uri = %uri, "Resource fetched"),
        DomainEvent::ToolCall { tool, ok } => info!(tool = %tool, ok = *ok, "Tool invoked"),
        DomainEvent::Error { kind, message, source } => {
            warn!(kind = %kind, source = %source, error = %message, "Request failed")
        }
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()> {
        info!("Starting MCP stdio transport");

        let sessions = Arc::new(SessionTable::new());
        let (guard, _outbound) = sessions.open();
        let session = guard.session().clone();
        for kind in EventKind::ALL {
            session.subscribe(kind, log_event);
        }
        session.activate();

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();

        while let Some(line) = reader.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!(request = %line, "Received request");

            let response = match serde_json::from_str::<McpRequest>(line) {
                Ok(request) => handler.handle_request(&session, request).await,
                Err(e) => {
                    error!(error = %e, "Parse error");
                    Some(McpResponse::error(None, JsonRpcError::parse_error(e.to_string())))
                }
            };
            let Some(response) = response else {
                continue;
            };

            let response_json = serde_json::to_string(&response)?;
            debug!(response = %response_json, "Sending response");

            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        info!("Stdio transport shutting down");
        drop(guard);
        Ok(())
    }
}
