use crate::error::HttpAppError;
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use yomiage_core::AppError;

/// Identity of a verified caller, stored in request extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub uid: String,
    pub email: Option<String>,
    /// Firebase app id attested by App Check, when checked
    pub app_id: Option<String>,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthenticated(
                    "Missing caller identity".to_string(),
                ))
            })
    }
}

// Handlers take `Option<CallerIdentity>` so a missing identity is a value, not a rejection
impl<S> OptionalFromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CallerIdentity>().cloned())
    }
}
