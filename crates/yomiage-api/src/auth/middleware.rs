use crate::auth::models::CallerIdentity;
use crate::error::HttpAppError;
use crate::middleware::get_request_id;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use yomiage_core::AppError;
use yomiage_services::{AppCheckTokenVerifier, IdTokenVerifier};

pub const APP_CHECK_HEADER: &str = "X-Firebase-AppCheck";

/// Verifiers applied to every callable request
#[derive(Clone)]
pub struct AuthState {
    pub id_tokens: Arc<dyn IdTokenVerifier>,
    /// `None` disables App Check enforcement
    pub app_check: Option<Arc<dyn AppCheckTokenVerifier>>,
}

fn unauthenticated(reason: impl Into<String>) -> Response {
    HttpAppError(AppError::Unauthenticated(reason.into())).into_response()
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Rejects requests without a valid App Check token (when enforced) or a valid ID token.
/// On success the verified [`CallerIdentity`] is inserted into request extensions.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Header values are copied out: no borrow of the request may live across an await
    let app_id = match auth_state.app_check {
        Some(ref verifier) => {
            let token = match request
                .headers()
                .get(APP_CHECK_HEADER)
                .and_then(|h| h.to_str().ok())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
            {
                Some(token) => token,
                None => return unauthenticated("Missing App Check token"),
            };

            match verifier.verify_app_check_token(&token).await {
                Ok(claims) => Some(claims.sub),
                Err(e) => return unauthenticated(format!("Invalid App Check token: {}", e)),
            }
        }
        None => None,
    };

    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return unauthenticated("Missing or malformed Authorization header"),
    };

    let user = match auth_state.id_tokens.verify_id_token(&token).await {
        Ok(user) => user,
        Err(e) => return unauthenticated(format!("Invalid ID token: {}", e)),
    };

    tracing::debug!(
        uid = %user.uid,
        app_id = ?app_id,
        request_id = ?get_request_id(&request),
        "Caller authenticated"
    );

    request.extensions_mut().insert(CallerIdentity {
        uid: user.uid,
        email: user.email,
        app_id,
    });

    next.run(request).await
}
