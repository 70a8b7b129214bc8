use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use yomiage_core::AppError;

use crate::error::HttpAppError;

/// Aborts the wrapped handler once `budget` has elapsed and answers with a
/// `DEADLINE_EXCEEDED` callable error.
pub async fn deadline_middleware(
    State(budget): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match tokio::time::timeout(budget, next.run(request)).await {
        Ok(response) => response,
        Err(_) => HttpAppError(AppError::DeadlineExceeded(format!(
            "{} exceeded {}s",
            path,
            budget.as_secs_f64()
        )))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn app(handler_delay: Duration) -> Router {
        Router::new()
            .route(
                "/",
                get(move || async move {
                    tokio::time::sleep(handler_delay).await;
                    "done"
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                Duration::from_millis(50),
                deadline_middleware,
            ))
    }

    #[tokio::test]
    async fn test_fast_handler_passes_through() {
        let response = app(Duration::ZERO)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_slow_handler_gets_callable_error() {
        let response = app(Duration::from_secs(5))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["status"], "DEADLINE_EXCEEDED");
        assert_eq!(body["error"]["message"], "DEADLINE_EXCEEDED");
    }
}
