//! Callable function wire format
//!
//! Requests are `POST` with a JSON body `{"data": <payload>}`; successful responses are
//! `{"result": <payload>}`. Envelope errors are reported as invalid-argument.

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use yomiage_core::AppError;

use crate::error::HttpAppError;

/// The `data` member of a callable request, still untyped
#[derive(Debug, Clone)]
pub struct CallableRequest(pub Value);

impl<S> FromRequest<S> for CallableRequest
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;

        match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) => Ok(CallableRequest(data)),
                None => Err(HttpAppError(AppError::InvalidArgument(
                    "Request body is missing data field".to_string(),
                ))),
            },
            _ => Err(HttpAppError(AppError::InvalidArgument(
                "Request body must be a JSON object".to_string(),
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResultEnvelope<T> {
    result: T,
}

/// Successful callable response
#[derive(Debug)]
pub struct CallableResponse<T>(pub T);

impl<T: Serialize> IntoResponse for CallableResponse<T> {
    fn into_response(self) -> Response {
        Json(ResultEnvelope { result: self.0 }).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_data() {
        let CallableRequest(data) =
            CallableRequest::from_request(json_request(r#"{"data":{"text":"hi"}}"#), &())
                .await
                .unwrap();
        assert_eq!(data, serde_json::json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_missing_data_is_invalid_argument() {
        let err = CallableRequest::from_request(json_request(r#"{"text":"hi"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_argument() {
        let err = CallableRequest::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_result_envelope() {
        let response = CallableResponse(serde_json::json!({"text": "hello"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"result": {"text": "hello"}}));
    }
}
