//! WebSocket transport layer and HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use msghub_realtime::connection::handle::ConnectionInfo;
use msghub_realtime::{ChannelTransport, ConnectionHandle, MessageHub, MetricsSnapshot};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The hub.
    pub hub: Arc<MessageHub>,
    /// Per-connection outbound frame buffer.
    pub outbound_buffer: usize,
}

/// GET {ws_path}: WebSocket upgrade
///
/// Connections start anonymous; clients authenticate in-band with an
/// `AUTHENTICATION` message.
pub async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(state, remote, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, remote: SocketAddr, socket: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();
    let (transport, mut outbound_rx) = ChannelTransport::new(
        conn_id.clone(),
        remote.ip().to_canonical().to_string(),
        state.outbound_buffer,
    );
    let handle = ConnectionHandle::new(transport);
    state.hub.on_connection_opened(&handle);

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound forwarder; dropping the receiver closes the transport.
    let outbound_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.hub.on_inbound_message(&handle, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %conn_id, "Ignoring binary frame");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.hub.on_connection_closed(&handle);

    info!(conn_id = %conn_id, remote = %remote, "WebSocket connection closed");
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": if state.hub.is_running() { "ok" } else { "stopped" },
        "connections": state.hub.connection_count(),
        "queue_len": state.hub.queue_len(),
    }))
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.hub.metrics())
}

/// GET /connections
pub async fn connections(State(state): State<AppState>) -> Json<Vec<ConnectionInfo>> {
    Json(state.hub.connections())
}
