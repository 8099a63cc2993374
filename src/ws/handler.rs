//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
///
/// Refuses the upgrade with `403` when the `Origin` header is present but
/// not on the allow-list. After the handshake the connection belongs to
/// the hub; its task is tracked so shutdown can wait for the close frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .map(|value| value.to_str().unwrap_or_default());
    if !state.allowed_origins.permits(origin) {
        tracing::warn!(origin = origin.unwrap_or_default(), "ws upgrade refused");
        return StatusCode::FORBIDDEN.into_response();
    }

    let hub = state.hub.clone();
    let settings = state.connection_settings;
    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| {
        let (writer, reader) = socket.split();
        connections.track_future(async move {
            run_connection(reader, writer, hub, settings).await;
        })
    })
}
