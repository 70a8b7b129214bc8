use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Message returned when the text to read aloud is missing
pub const TEXT_REQUIRED_MESSAGE: &str = "テキストが指定されていません";

/// Request payload for speech synthesis
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SpeechRequest {
    pub text: String,
}

impl SpeechRequest {
    /// Accepts only a non-empty string `text`; any other shape is rejected with one message
    pub fn from_payload(data: &serde_json::Value) -> Result<Self, AppError> {
        match data.get("text").and_then(|t| t.as_str()) {
            Some(text) if !text.is_empty() => Ok(SpeechRequest {
                text: text.to_string(),
            }),
            _ => Err(AppError::InvalidArgument(TEXT_REQUIRED_MESSAGE.to_string())),
        }
    }
}

/// Retrieval URL of the stored audio
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResult {
    pub audio_url: String,
}
