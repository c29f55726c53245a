//! Liveness, readiness and metrics endpoints.
//!
//! - `/health`: process is up, no dependency checks
//! - `/ready`: user store and revocation store both answer a ping
//! - `/metrics`: Prometheus text exposition

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe.
///
/// Returns 200 when both stores respond, 503 otherwise. The body names the
/// failing dependency but never the underlying error, which is logged.
#[tracing::instrument(skip_all, name = "auth.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.users.ping().await {
        tracing::warn!(target: "auth.health", error = %e, "Readiness check failed: database");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("unhealthy"),
                revocation_store: None,
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    if let Err(e) = state.revocations.ping().await {
        tracing::warn!(
            target: "auth.health",
            error = %e,
            "Readiness check failed: revocation store"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("healthy"),
                revocation_store: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            revocation_store: Some("healthy"),
            error: None,
        }),
    )
}

pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
