//! HTTP+SSE Transport
//!
//! `GET /sse` opens a session and streams everything queued for it;
//! `POST /messages?sessionId=<id>` submits a request whose response comes
//! back on that stream as `event: message`. Domain events are pushed as
//! `event: <kind>`. Dropping the stream closes the session.

use super::{McpHandler, Transport};
use crate::events::EventKind;
use crate::protocol::McpRequest;
use crate::session::{Outbound, SessionGuard, SessionTable};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use edgar_core::ErrorKind;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "x-mcp-token";

/// Shared state for HTTP handlers
struct HttpState<H> {
    handler: Arc<H>,
    sessions: Arc<SessionTable>,
}

/// HTTP+SSE bidirectional transport
pub struct HttpSseTransport {
    bind_addr: String,
    shared_secret: Option<String>,
    sessions: Arc<SessionTable>,
}

impl HttpSseTransport {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            shared_secret: None,
            sessions: Arc::new(SessionTable::new()),
        }
    }

    pub fn with_shared_secret(mut self, secret: Option<String>) -> Self {
        self.shared_secret = secret;
        self
    }

    /// Sessions served by this transport.
    pub fn sessions(&self) -> Arc<SessionTable> {
        self.sessions.clone()
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Every session is closed as soon as the signal fires, which ends
    /// the open event streams and lets graceful shutdown complete.
    pub async fn serve_with_shutdown<H, F>(self, listener: TcpListener, handler: Arc<H>, shutdown: F) -> Result<()>
    where
        H: McpHandler + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(handler, self.sessions.clone(), self.shared_secret);
        let sessions = self.sessions;
        info!(addr = %listener.local_addr()?, "HTTP+SSE transport listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!(sessions = sessions.len(), "HTTP+SSE transport shutting down");
                sessions.close_all();
            })
            .await?;

        info!("HTTP+SSE transport stopped");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for HttpSseTransport {
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()> {
        info!(addr = %self.bind_addr, "Starting HTTP+SSE transport");
        if self.shared_secret.is_some() {
            info!("Shared-secret authentication enabled");
        }

        let listener = TcpListener::bind(&self.bind_addr).await?;
        self.serve_with_shutdown(listener, handler, shutdown_signal()).await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// Routes with CORS and, when a secret is given, token checking.
pub fn router<H: McpHandler + 'static>(
    handler: Arc<H>,
    sessions: Arc<SessionTable>,
    shared_secret: Option<String>,
) -> Router {
    let state = Arc::new(HttpState { handler, sessions });
    let secret: Option<Arc<str>> = shared_secret.map(Arc::from);

    Router::new()
        .route("/sse", get(sse_handler::<H>))
        .route("/messages", post(message_handler::<H>))
        .route("/health", get(health_handler::<H>))
        .route("/tools", get(tools_handler::<H>))
        .with_state(state)
        .layer(middleware::from_fn_with_state(secret, require_secret))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

// === Handlers ===

fn error_response(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Response {
    let body = json!({ "error": { "kind": kind, "message": message.into() } });
    (status, Json(body)).into_response()
}

async fn require_secret(State(secret): State<Option<Arc<str>>>, request: Request, next: Next) -> Response {
    let Some(secret) = secret else {
        return next.run(request).await;
    };
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let headers = request.headers();
    let presented = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    if presented == Some(secret.as_ref()) {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Rejected request without valid token");
        error_response(StatusCode::UNAUTHORIZED, ErrorKind::BadInput, "Missing or invalid token")
    }
}

async fn health_handler<H: McpHandler + 'static>(State(state): State<Arc<HttpState<H>>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::SERVER_VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sessions": state.sessions.len()
    }))
}

async fn tools_handler<H: McpHandler + 'static>(State(state): State<Arc<HttpState<H>>>) -> impl IntoResponse {
    Json(json!({ "tools": state.handler.list_tools() }))
}

#[derive(Debug, Deserialize)]
struct SseQuery {
    events: Option<String>,
}

fn frame<T: Serialize>(name: &str, payload: &T) -> Event {
    match serde_json::to_string(payload) {
        Ok(data) => Event::default().event(name).data(data),
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

fn outbound_frame(message: Outbound) -> Event {
    match message {
        Outbound::Message(response) => frame("message", &response),
        Outbound::Event(event) => frame(event.kind().as_str(), &event),
    }
}

/// Drains the session queue. The guard lives as long as the stream.
fn session_stream(
    rx: mpsc::UnboundedReceiver<Outbound>,
    guard: SessionGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        Some((Ok(outbound_frame(message)), (rx, guard)))
    })
}

async fn sse_handler<H: McpHandler + 'static>(
    State(state): State<Arc<HttpState<H>>>,
    Query(query): Query<SseQuery>,
) -> Response {
    let kinds = match EventKind::parse_list(query.events.as_deref()) {
        Ok(kinds) => kinds,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.kind(), e.to_string()),
    };

    let (guard, rx) = state.sessions.open();
    let session = guard.session().clone();
    session.forward_events(&kinds);
    session.activate();
    info!(session = %session.id(), events = ?kinds, "SSE client connected");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session.id()));
    let stream = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(session_stream(rx, guard));

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keepalive"),
        )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageQuery {
    session_id: Option<String>,
}

async fn message_handler<H: McpHandler + 'static>(
    State(state): State<Arc<HttpState<H>>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(id) = query.session_id.filter(|id| !id.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, ErrorKind::BadInput, "Missing sessionId");
    };
    let Some(session) = state.sessions.get(&id) else {
        debug!(session = %id, "Message for unknown session");
        return error_response(StatusCode::NOT_FOUND, ErrorKind::NotFound, format!("No open session '{}'", id));
    };
    let request: McpRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, ErrorKind::BadInput, format!("Invalid JSON-RPC message: {}", e))
        }
    };

    debug!(session = %id, method = %request.method, "HTTP MCP request");
    let handler = state.handler.clone();
    tokio::spawn(async move {
        if let Some(response) = handler.handle_request(&session, request).await {
            if !session.send(Outbound::Message(response)) {
                debug!(session = %session.id(), "Session closed before response was delivered");
            }
        }
    });

    StatusCode::ACCEPTED.into_response()
}
