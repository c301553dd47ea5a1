use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use courier_hub::{Hub, HubHandle};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::config::ServerConfig;
use crate::session::SessionSettings;

pub mod routes;

/// Server application state
pub struct AppState {
    /// Handle to the running hub
    pub hub: HubHandle,
    /// Settings applied to every new session
    pub session: SessionSettings,
}

impl AppState {
    pub fn new(hub: HubHandle, session: SessionSettings) -> Self {
        Self { hub, session }
    }
}

/// Start the hub and the HTTP server.
///
/// Returns an error if the listener cannot be bound; otherwise runs until
/// ctrl-c.
pub async fn start(config: ServerConfig) -> Result<()> {
    let hub = Hub::spawn(config.hub_config());
    let state = Arc::new(AppState::new(hub, config.session_settings()));

    let app = create_router(state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Starting Axum HTTP server on {}", addr);
    info!("Open http://localhost:{} in your browser", config.port);

    serve(listener, app).await
}

/// Serve `app` on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .merge(routes::websocket::router(state))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.hub.client_count().await {
        Ok(clients) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "courier-server",
                "version": env!("CARGO_PKG_VERSION"),
                "clients": clients
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "courier-server",
                    "version": env!("CARGO_PKG_VERSION"),
                    "error": e.to_string()
                })),
            )
        }
    }
}
