//! HTTP server for health and metrics endpoints

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use eyre::eyre;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tracing::info;

use crate::metrics::{ListenerStats, SharedMetrics};

#[derive(Clone)]
pub struct AppState {
    pub metrics: SharedMetrics,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub listeners: Vec<ListenerStats>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        listeners: state.metrics.listener_stats(),
    })
}

/// Liveness probe (always OK while the server runs)
async fn liveness() -> &'static str {
    "OK"
}

/// Ready once every listener has scanned at least one block
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let stats = state.metrics.listener_stats();
    if !stats.is_empty() && stats.iter().all(|s| s.last_polled_block > 0) {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY")
    }
}

async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    match Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

pub fn router(metrics: SharedMetrics) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(AppState { metrics })
}

/// Serve health and metrics until the task is dropped
pub async fn start_server(bind_address: &str, port: u16, metrics: SharedMetrics) -> eyre::Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .map_err(|e| eyre!("Invalid bind address {}:{}: {}", bind_address, port, e))?;
    info!("Health server listening on {}", addr);
    info!("  /health  - Listener status (JSON)");
    info!("  /metrics - Prometheus metrics");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(metrics)).await?;

    Ok(())
}
