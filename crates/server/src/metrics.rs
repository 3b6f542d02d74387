//! Read-only ops endpoint.
//!
//! Serves the aggregate subsystem health/metrics report and a liveness
//! probe over HTTP, on a port separate from the game gateway.

use crate::server::SharedEngine;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use protocol::messages::MetricsReport;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;

/// Serve `/metrics` and `/healthz` until the process exits.
pub async fn serve(state: SharedEngine, addr: SocketAddr) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Ops endpoint on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics(State(state): State<SharedEngine>) -> Json<MetricsReport> {
    Json(state.read().await.metrics_report())
}

async fn healthz(State(state): State<SharedEngine>) -> impl IntoResponse {
    let engine = state.read().await;
    let degraded: Vec<&str> = engine
        .health()
        .iter()
        .filter(|(_, h)| !h.healthy)
        .map(|(name, _)| *name)
        .collect();

    if degraded.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "subsystems": degraded })),
        )
    }
}
