//! HTTP error response conversion
//!
//! Every failure of a callable operation is rendered in the callable wire format:
//! `{"error": {"status": "<STATUS>", "message": "<message>"}}` with the HTTP status of
//! its public kind.
//!
//! **Handler pattern:** return `Result<impl IntoResponse, HttpAppError>` and convert
//! domain errors with `?` / `.map_err(Into::into)`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use yomiage_core::config::is_production_env;
use yomiage_core::{AppError, ErrorMetadata, LogLevel};

/// Error member of a callable response
#[derive(Debug, Serialize, ToSchema)]
pub struct CallableErrorBody {
    /// Canonical status, e.g. `INVALID_ARGUMENT`
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: CallableErrorBody,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from yomiage-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

/// Convert JSON body deserialization failures into invalid-argument.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidArgument(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error,
                details = %error.detailed_message(),
                error_type = error_type,
                "Error occurred"
            );
        }
    }
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| is_production_env(&env))
        .unwrap_or(false)
}

impl HttpAppError {
    fn body(&self, include_details: bool) -> ErrorResponse {
        let app_error = &self.0;
        ErrorResponse {
            error: CallableErrorBody {
                status: app_error.error_code().to_string(),
                message: app_error.client_message(),
                details: include_details.then(|| app_error.detailed_message()),
            },
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Internal causes never reach the caller; other details only outside production
        let include_details = !is_production() && !app_error.is_sensitive();

        (status, Json(self.body(include_details))).into_response()
    }
}
