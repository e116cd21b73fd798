//! MCP Server
//!
//! Transport-agnostic dispatch of JSON-RPC methods onto the registry.
//! Every request runs on behalf of a [`Session`], whose publisher receives
//! the domain events raised while serving it.

use crate::interaction_log::{Interaction, InteractionLog};
use crate::protocol::{JsonRpcError, McpRequest, McpResponse};
use crate::registry::{Registry, ToolContext, ToolError};
use crate::session::Session;
use crate::config::Limits;
use crate::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use edgar_core::Upstream;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub struct McpServer {
    registry: Arc<Registry>,
    upstream: Arc<dyn Upstream>,
    limits: Limits,
    interaction_log: Option<InteractionLog>,
    name: Option<String>,
}

impl McpServer {
    pub fn new(registry: Arc<Registry>, upstream: Arc<dyn Upstream>, limits: Limits) -> Self {
        Self {
            registry,
            upstream,
            limits,
            interaction_log: None,
            name: None,
        }
    }

    pub fn with_interaction_log(mut self, log: InteractionLog) -> Self {
        self.interaction_log = Some(log);
        self
    }

    /// Server name override reported by `initialize`.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn context(&self, session: &Arc<Session>) -> ToolContext {
        ToolContext {
            upstream: self.upstream.clone(),
            limits: self.limits,
            events: session.publisher(),
            session_id: session.id().to_string(),
        }
    }

    /// Handle one request. Notifications are processed but get no response.
    pub async fn handle_request(&self, session: &Arc<Session>, request: McpRequest) -> Option<McpResponse> {
        debug!(method = %request.method, session = %session.id(), "Handling MCP request");
        let notification = request.is_notification();
        let id = request.id.clone();

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "notifications/initialized" | "initialized" => {
                debug!(session = %session.id(), "Client initialized");
                McpResponse::success(id, json!({}))
            }
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => McpResponse::success(id, json!({ "tools": self.registry.describe() })),
            "tools/call" => self.handle_tools_call(session, request).await,
            "resources/list" => McpResponse::success(id, json!({ "resources": [] })),
            "resources/templates/list" => McpResponse::success(
                id,
                json!({ "resourceTemplates": self.registry.resource_templates() }),
            ),
            "resources/read" => self.handle_resources_read(session, request).await,
            _ => McpResponse::error(id, JsonRpcError::method_not_found(&request.method)),
        };

        if notification {
            None
        } else {
            Some(response)
        }
    }

    fn handle_initialize(&self, request: &McpRequest) -> McpResponse {
        let client_name = request
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|ci| ci.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client = %client_name, "Client connected");

        let server_name = self.name.as_deref().unwrap_or(SERVER_NAME);
        McpResponse::success(
            request.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false }
                },
                "serverInfo": {
                    "name": server_name,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    async fn handle_tools_call(&self, session: &Arc<Session>, request: McpRequest) -> McpResponse {
        let params = request.params.unwrap_or(Value::Null);
        let name = match params.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                return McpResponse::error(request.id, JsonRpcError::invalid_params("Missing tool name"))
            }
        };
        let arguments = params.get("arguments").cloned();

        let ctx = self.context(session);
        let result = self.registry.invoke(&name, arguments.clone(), &ctx).await;

        if let Some(log) = &self.interaction_log {
            log.record(Interaction::new(
                session.id(),
                &name,
                arguments.unwrap_or(Value::Null),
                result.is_ok(),
            ))
            .await;
        }

        McpResponse::success(request.id, tool_result(result))
    }

    async fn handle_resources_read(&self, session: &Arc<Session>, request: McpRequest) -> McpResponse {
        let uri = match request
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
        {
            Some(uri) => uri.to_string(),
            None => return McpResponse::error(request.id, JsonRpcError::invalid_params("Missing resource uri")),
        };

        match self.registry.read_resource(&uri, &self.context(session)).await {
            Ok(value) => McpResponse::success(
                request.id,
                json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": "application/json",
                        "text": pretty(&value)
                    }]
                }),
            ),
            Err(e) => McpResponse::error(request.id, JsonRpcError::from_kind(e.kind, e.message)),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `tools/call` result envelope. Failures are results with `isError`, not
/// JSON-RPC errors.
fn tool_result(result: Result<Value, ToolError>) -> Value {
    match result {
        Ok(value) => {
            let mut envelope = json!({
                "content": [{ "type": "text", "text": pretty(&value) }],
                "isError": false
            });
            if value.is_object() {
                envelope["structuredContent"] = value;
            }
            envelope
        }
        Err(e) => json!({
            "content": [{ "type": "text", "text": e.to_string() }],
            "isError": true,
            "structuredContent": { "error": e }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::session::{Outbound, SessionTable};
    use crate::tools::build_registry;
    use crate::tools::submissions::tests::{submissions, PATH};
    use crate::tools::testing::FakeUpstream;

    fn server(upstream: FakeUpstream) -> McpServer {
        let registry = Arc::new(build_registry(true).unwrap());
        McpServer::new(registry, Arc::new(upstream), Limits::default())
    }

    fn call(id: i64, method: &str, params: Value) -> McpRequest {
        McpRequest::new(method).with_id(id).with_params(params)
    }

    #[tokio::test]
    async fn test_initialize_and_notification() {
        let table = Arc::new(SessionTable::new());
        let (guard, _rx) = table.open();
        let server = server(FakeUpstream::default()).with_name(Some("sec".into()));

        let resp = server
            .handle_request(guard.session(), call(1, "initialize", json!({ "clientInfo": { "name": "t" } })))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "sec");

        let none = server
            .handle_request(guard.session(), McpRequest::new("notifications/initialized"))
            .await;
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_and_templates() {
        let table = Arc::new(SessionTable::new());
        let (guard, _rx) = table.open();
        let server = server(FakeUpstream::default());

        let resp = server.handle_request(guard.session(), call(1, "tools/list", json!({}))).await.unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 8);

        let resp = server
            .handle_request(guard.session(), call(2, "resources/templates/list", json!({})))
            .await
            .unwrap();
        let templates = resp.result.unwrap();
        assert_eq!(templates["resourceTemplates"][0]["uriTemplate"], "sec://submissions/{cik}{/path}");
    }

    #[tokio::test]
    async fn test_tool_call_envelopes() {
        let table = Arc::new(SessionTable::new());
        let (guard, _rx) = table.open();
        guard.session().activate();
        let server = server(FakeUpstream::default().with(PATH, submissions(3)));

        let resp = server
            .handle_request(
                guard.session(),
                call(1, "tools/call", json!({ "name": "get-company-submissions", "arguments": { "cik": "320193" } })),
            )
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["filings"]["total"], 3);

        let resp = server
            .handle_request(guard.session(), call(2, "tools/call", json!({ "name": "nope" })))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["kind"], "NotFound");

        let resp = server
            .handle_request(
                guard.session(),
                call(3, "tools/call", json!({ "name": "get-company-facts", "arguments": { "cik": "42" } })),
            )
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["kind"], "UpstreamUnavailable");

        let resp = server.handle_request(guard.session(), call(4, "tools/call", json!({}))).await.unwrap();
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_events_reach_session_stream() {
        let table = Arc::new(SessionTable::new());
        let (guard, mut rx) = table.open();
        guard.session().forward_events(&EventKind::ALL);
        guard.session().activate();
        let server = server(FakeUpstream::default().with(PATH, submissions(1)));

        server
            .handle_request(
                guard.session(),
                call(1, "tools/call", json!({ "name": "get-company-submissions", "arguments": { "cik": "320193" } })),
            )
            .await;

        let mut kinds = Vec::new();
        while let Ok(Outbound::Event(event)) = rx.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec![EventKind::ResourceUpdate, EventKind::ToolCall]);
    }

    #[tokio::test]
    async fn test_resource_read_errors_carry_kind() {
        let table = Arc::new(SessionTable::new());
        let (guard, _rx) = table.open();
        let server = server(FakeUpstream::default());

        let resp = server
            .handle_request(guard.session(), call(1, "resources/read", json!({ "uri": "sec://nothing/here" })))
            .await
            .unwrap();
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32002);
        assert_eq!(error.data.unwrap()["kind"], "NotFound");

        let resp = server.handle_request(guard.session(), call(2, "bogus", json!({}))).await.unwrap();
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_interaction_log_records_calls() {
        let dir = tempfile::tempdir().unwrap();
        let table = Arc::new(SessionTable::new());
        let (guard, _rx) = table.open();
        let server = server(FakeUpstream::default()).with_interaction_log(InteractionLog::new(dir.path()));

        server
            .handle_request(guard.session(), call(1, "tools/call", json!({ "name": "get-company-facts", "arguments": { "cik": "1" } })))
            .await;

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let entries: Vec<Value> = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(entries[0]["tool"], "get-company-facts");
        assert_eq!(entries[0]["ok"], false);
        assert_eq!(entries[0]["session"], guard.session().id());
    }
}
