//! Route configuration and setup.
//!
//! Callable functions are mounted at `/<operationName>` behind the Firebase auth
//! middleware; health checks and API docs stay public.

mod health;

use crate::api_doc::ApiDoc;
use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::middleware::{deadline_middleware, request_id_middleware};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use yomiage_core::Config;

/// Callable payloads are small JSON documents; images travel by URL
const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let callable_routes = callable_routes(config).layer(axum::middleware::from_fn_with_state(
        Arc::new(state.auth.clone()),
        auth_middleware,
    ));

    let app = public_routes(state.clone())
        .merge(callable_routes)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Each operation gets its own concurrency cap and wall-clock budget
fn callable_routes(config: &Config) -> Router<Arc<AppState>> {
    let max_instances = config.max_instances().max(1);
    let timeout = Duration::from_secs(config.function_timeout_secs());

    tracing::info!(
        max_instances,
        function_timeout_secs = config.function_timeout_secs(),
        location = %config.location_id(),
        "Callable functions configured"
    );

    // Queued calls wait for a slot before their deadline starts running
    let limits = || {
        ServiceBuilder::new()
            .layer(ConcurrencyLimitLayer::new(max_instances))
            .layer(axum::middleware::from_fn_with_state(
                timeout,
                deadline_middleware,
            ))
    };

    Router::new()
        .route(
            "/generateOcm",
            post(handlers::ocr::generate_ocm).layer(limits()),
        )
        .route(
            "/textToSpeechFunction",
            post(handlers::speech::text_to_speech).layer(limits()),
        )
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/live", get(health::liveness_check))
        .route(
            "/health",
            get({
                let state = state.clone();
                move || {
                    let state = state.clone();
                    async { health::health_check(state).await }
                }
            }),
        )
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
