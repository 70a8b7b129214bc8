use crate::api_doc::{SpeechCallableRequest, SpeechCallableResponse};
use crate::auth::models::CallerIdentity;
use crate::callable::{CallableRequest, CallableResponse};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::extract::State;
use std::sync::Arc;
use yomiage_core::models::SpeechResult;
use yomiage_core::AppError;

#[utoipa::path(
    post,
    path = "/textToSpeechFunction",
    tag = "speech",
    request_body = SpeechCallableRequest,
    responses(
        (status = 200, description = "URL of the stored MP3", body = SpeechCallableResponse),
        (status = 400, description = "text missing, empty or not a string", body = ErrorResponse),
        (status = 401, description = "Missing or invalid ID / App Check token", body = ErrorResponse),
        (status = 500, description = "Synthesis or storage failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, caller, data),
    fields(uid = ?caller.as_ref().map(|c| c.uid.as_str()), operation = "text_to_speech")
)]
pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    caller: Option<CallerIdentity>,
    CallableRequest(data): CallableRequest,
) -> Result<CallableResponse<SpeechResult>, HttpAppError> {
    let user_id = caller.as_ref().map(|c| c.uid.as_str());

    let result = state
        .speech
        .synthesize(&data, user_id)
        .await
        .map_err(AppError::from)?;

    Ok(CallableResponse(result))
}
