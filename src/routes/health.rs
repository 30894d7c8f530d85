use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Root endpoint - basic status
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.config.addon_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "manifest": "/manifest.json"
    }))
}

/// Snapshot stats
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotStats {
    loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_seconds: Option<u64>,
    movies: usize,
    series: usize,
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime: u64,
    resolution: &'static str,
    snapshot: SnapshotStats,
}

/// GET /health - catalog state without triggering a refresh
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    let snapshot = state.store.current().await;

    // Not loaded yet is normal until the first query
    let status = if snapshot.is_loaded() { "ok" } else { "empty" };

    let health = HealthResponse {
        status: status.to_string(),
        uptime,
        resolution: if state.config.tmdb_key.is_some() { "tmdb" } else { "passthrough" },
        snapshot: SnapshotStats {
            loaded: snapshot.is_loaded(),
            loaded_at: snapshot.loaded_at_utc.map(|t| t.to_rfc3339()),
            age_seconds: snapshot.loaded_at.map(|t| t.elapsed().as_secs()),
            movies: snapshot.movies.len(),
            series: snapshot.series.len(),
        },
    };

    Json(health)
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Liveness probe
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
