//! Health check endpoint handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_authz::TreeStore;
use tracing::{debug, warn};

use crate::error::RestResult;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// # HTTP Request
///
/// `GET [base]/health`
///
/// # Response
///
/// - `200 OK` - `{"status", "backend", "revision", "timestamp"}`
pub async fn health_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: TreeStore + ?Sized + 'static,
{
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": state.backend_name(),
        "revision": state.manager().revision(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}

/// Handler for the liveness probe.
///
/// `GET [base]/health/live`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for the readiness probe.
///
/// Runs the store's health check.
///
/// # Response
///
/// - `200 OK` - Store reachable
/// - `503 Service Unavailable` - Store check failed
pub async fn readiness_handler<S>(State(state): State<AppState<S>>) -> Response
where
    S: TreeStore + ?Sized + 'static,
{
    debug!("Processing readiness check request");

    let backend_name = state.backend_name();
    match state.manager().health_check().await {
        Ok(()) => {
            let response = serde_json::json!({
                "status": "ready",
                "backend": backend_name,
                "checks": {
                    "storage": "ok"
                }
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            warn!(backend = backend_name, error = %e, "Readiness check failed");
            let response = serde_json::json!({
                "status": "unavailable",
                "backend": backend_name,
                "checks": {
                    "storage": e.to_string()
                }
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
        }
    }
}
