//! Health, readiness and metrics handlers.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub database: String,
}

/// GET /health - Liveness only; never touches the database.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - Readiness check (verifies database connectivity)
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let (status, database) = match state.backend.ping().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("error: {}", e.public_message()),
            )
        }
    };

    let body = ReadyResponse {
        ready: status == StatusCode::OK,
        database,
    };
    (status, Json(body)).into_response()
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    handle: Option<Extension<PrometheusHandle>>,
) -> Response {
    state.metrics.record_cache_stats(state.cache.stats());

    match handle {
        Some(Extension(handle)) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
