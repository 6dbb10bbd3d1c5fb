//! Router and listener loop.

use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use sam_core::clock::now_ms;
use sam_store::ValueStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::health::{self, HealthResponse};

/// Exposition format content type.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest controller values.
    pub store: ValueStore,
    /// Renders the exporter's own counters.
    pub prometheus: PrometheusHandle,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// State for a server starting now.
    pub fn new(store: ValueStore, prometheus: PrometheusHandle) -> Self {
        Self {
            store,
            prometheus,
            start_time: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/currentValues", get(current_values_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve `state` on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "http server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("http server stopped");
    Ok(())
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = sam_exposition::render_page(&state.store, now_ms());
    body.push_str(&state.prometheus.render());
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}

/// GET /currentValues
async fn current_values_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.store.snapshot())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.store.len(),
        state.store.liveness(),
        now_ms(),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
