//! Health check handlers and response types.

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const PROBE_KEY: &str = "health-check-non-existent-key";

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub app_check: bool,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Storage reachability; 503 when the probe fails or times out.
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let storage = state.storage.clone();
    let storage_status = run_check(
        TIMEOUT,
        async move { storage.exists(PROBE_KEY).await.map(drop) },
        "unhealthy",
    )
    .await;

    let healthy = storage_status == "healthy";
    if !healthy {
        tracing::error!(storage = %storage_status, "Storage health check failed");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        storage: storage_status,
        app_check: state.auth.app_check.is_some(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
