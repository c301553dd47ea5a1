//! Relay WebSocket endpoint.
//!
//! Accepts upgrades from any origin. Each upgraded socket runs its own
//! [`session`](crate::session).

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use tracing::{debug, info};

use crate::server::AppState;
use crate::session;

/// Create the WebSocket router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// GET /ws
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("WebSocket connection request");

    let hub = state.hub.clone();
    let settings = state.session.clone();

    ws.on_failed_upgrade(|e| debug!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| session::run(socket, hub, settings))
}
