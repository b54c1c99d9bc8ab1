//! HTTP bindings for the MCP server.
//!
//! Two bindings share the same dispatch engine:
//!
//! - `POST /api/mcp` answers one envelope with one envelope (synchronous reply).
//! - `GET /mcp/sse` + `POST /mcp/message` deliver responses over a long-lived
//!   event stream (streaming broadcast).

pub mod sse;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{sse::Sse, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::protocol::*;
use crate::mcp::server::McpServer;

pub use sse::{BroadcastReport, ConnectionStream, SseHub, MESSAGE_ENDPOINT};

/// Header naming the SSE connection a posted message belongs to.
pub const CONNECTION_HEADER: &str = "x-mcp-connection-id";

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: Arc<McpServer>,
    hub: Arc<SseHub>,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>, hub: Arc<SseHub>) -> Self {
        Self { server, hub }
    }

    pub fn hub(&self) -> &Arc<SseHub> {
        &self.hub
    }
}

/// Build the router for both bindings.
pub fn router(state: HttpState) -> Router {
    Router::new()
        // Synchronous reply
        .route("/api/mcp", post(handle_sync))
        .route("/api/mcp/health", get(sync_health))
        .route("/api/mcp/info", get(sync_info))
        // Streaming broadcast
        .route("/mcp/sse", get(sse_connect))
        .route(MESSAGE_ENDPOINT, post(sse_message))
        .route("/mcp/health", get(sse_health))
        .route("/mcp/info", get(sse_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_server(config: &Config, server: Arc<McpServer>) -> Result<()> {
    let hub = Arc::new(SseHub::new(config.sse_buffer));
    hub.spawn_heartbeat(config.heartbeat_interval());
    hub.spawn_notification_forwarder(server.subscribe_notifications());

    let app = router(HttpState::new(server, hub.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::HttpServer(format!("failed to bind {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .map_err(|e| Error::HttpServer(e.to_string()))?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal(hub: Arc<SseHub>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    // Open event streams would otherwise hold graceful shutdown forever.
    hub.shutdown();
}

/// Decode and dispatch one posted body.
async fn dispatch_body(server: &McpServer, body: &[u8]) -> Option<JsonRpcMessage> {
    match parse_slice(body) {
        Ok(msg) => server.handle_message(msg).await,
        Err(failure) => {
            warn!("Rejected posted body: {}", failure);
            Some(failure.to_response())
        }
    }
}

// ===== Synchronous reply =====

async fn handle_sync(State(state): State<HttpState>, body: Bytes) -> Response {
    match dispatch_body(&state.server, &body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn sync_health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": state.server.server_info().version,
    }))
}

async fn sync_info(State(state): State<HttpState>) -> impl IntoResponse {
    let server = &state.server;
    Json(json!({
        "name": server.server_info().name,
        "version": server.server_info().version,
        "protocolVersion": MCP_VERSION,
        "transport": "http",
        "capabilities": server.capabilities(),
        "metrics": server.metrics(),
    }))
}

// ===== Streaming broadcast =====

async fn sse_connect(
    State(state): State<HttpState>,
) -> std::result::Result<Sse<ConnectionStream>, (StatusCode, Json<serde_json::Value>)> {
    let (id, receiver) = state.hub.open_connection().map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    Ok(Sse::new(ConnectionStream::new(id, state.hub.clone(), receiver)))
}

async fn sse_message(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let connection_id = headers
        .get(CONNECTION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(response) = dispatch_body(&state.server, &body).await else {
        return Json(json!({ "status": "processed" })).into_response();
    };

    let Some(id) = connection_id else {
        return Json(response).into_response();
    };
    if !state.hub.contains(&id) {
        debug!("Connection {} is not open, replying directly", id);
        return Json(response).into_response();
    }

    match state.hub.send(&id, &response) {
        Ok(()) => Json(json!({ "status": "sent", "connectionId": id })).into_response(),
        // Delivery is at most once: a failed stream write is not retried here.
        Err(e) => {
            warn!("Dropping response for {}: {}", id, e);
            (
                StatusCode::GONE,
                Json(json!({ "status": "failed", "connectionId": id })),
            )
                .into_response()
        }
    }
}

async fn sse_health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "transport": "sse",
        "activeConnections": state.hub.connection_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn sse_info(State(state): State<HttpState>) -> impl IntoResponse {
    let info = state.server.server_info();
    Json(json!({
        "name": info.name,
        "version": info.version,
        "protocolVersion": MCP_VERSION,
        "transport": "sse",
        "endpoints": {
            "sse": "/mcp/sse",
            "message": MESSAGE_ENDPOINT,
            "health": "/mcp/health",
            "info": "/mcp/info",
        },
        "metrics": state.server.metrics(),
    }))
}
