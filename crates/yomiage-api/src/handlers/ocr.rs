use crate::api_doc::{OcrCallableRequest, OcrCallableResponse};
use crate::auth::models::CallerIdentity;
use crate::callable::{CallableRequest, CallableResponse};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::extract::State;
use std::sync::Arc;
use yomiage_core::models::OcrResult;
use yomiage_core::AppError;

#[utoipa::path(
    post,
    path = "/generateOcm",
    tag = "ocr",
    request_body = OcrCallableRequest,
    responses(
        (status = 200, description = "Transcribed text", body = OcrCallableResponse),
        (status = 400, description = "imageUrl missing or empty", body = ErrorResponse),
        (status = 401, description = "Missing or invalid ID / App Check token", body = ErrorResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, caller, data),
    fields(uid = ?caller.as_ref().map(|c| c.uid.as_str()), operation = "generate_ocm")
)]
pub async fn generate_ocm(
    State(state): State<Arc<AppState>>,
    caller: Option<CallerIdentity>,
    CallableRequest(data): CallableRequest,
) -> Result<CallableResponse<OcrResult>, HttpAppError> {
    let result = state.ocr.recognize(data).await.map_err(AppError::from)?;

    tracing::info!(text_chars = result.text.chars().count(), "Text recognition completed");

    Ok(CallableResponse(result))
}
