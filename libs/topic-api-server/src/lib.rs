//! HTTP + WebSocket API over the topic engine, the ingest controls and
//! the profile store.

mod error;
mod http;
mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;

use mqtt_source::StatusReceiver;
use pipeline::IngestHandle;
use profiles::ProfileRepository;
use topic_engine::TopicEngine;

pub use error::ServerError;

const DEFAULT_WS_BUFFER: usize = 256;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<TopicEngine>,
    ingest: IngestHandle,
    profiles: Arc<dyn ProfileRepository>,
    status: StatusReceiver,
    ws_buffer: usize,
}

impl AppState {
    pub fn new(ingest: IngestHandle, profiles: Arc<dyn ProfileRepository>, status: StatusReceiver) -> Self {
        Self {
            engine: ingest.engine().clone(),
            ingest,
            profiles,
            status,
            ws_buffer: DEFAULT_WS_BUFFER,
        }
    }

    /// Per-client queue of batch notifications awaiting the socket.
    pub fn with_ws_buffer(mut self, ws_buffer: usize) -> Self {
        self.ws_buffer = ws_buffer.max(1);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tree", get(http::handle_tree))
        .route("/api/tree/toggle/{*id}", post(http::handle_toggle))
        .route("/api/tree/expand-all", post(http::handle_expand_all))
        .route("/api/tree/collapse-all", post(http::handle_collapse_all))
        .route("/api/history/{*topic}", get(http::handle_history))
        .route("/api/messages/{id}", get(http::handle_message))
        .route("/api/diff", get(http::handle_diff))
        .route("/api/reset", post(http::handle_reset))
        .route("/api/pause", post(http::handle_pause))
        .route("/api/resume", post(http::handle_resume))
        .route("/api/stats", get(http::handle_stats))
        .route(
            "/api/profiles",
            get(http::handle_list_profiles).post(http::handle_create_profile),
        )
        .route(
            "/api/profiles/{id}",
            get(http::handle_get_profile)
                .put(http::handle_update_profile)
                .delete(http::handle_delete_profile),
        )
        .route("/ws", get(ws::handle_ws))
        .with_state(state)
}

/// Serve the API on `0.0.0.0:port` until `shutdown` is cancelled.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ServerError::Bind { port, source })?;
    tracing::info!(port, "api listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("api stopped");
    Ok(())
}
