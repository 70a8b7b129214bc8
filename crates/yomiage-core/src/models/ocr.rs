use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Request payload for text recognition
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequest {
    /// `https://`, `gs://` or `data:` URL of the image
    #[validate(length(min = 1, message = "imageUrl must not be empty"))]
    pub image_url: String,
}

impl OcrRequest {
    /// Parse and validate the `data` member of a callable request
    pub fn from_payload(data: serde_json::Value) -> Result<Self, AppError> {
        let request: OcrRequest = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidArgument(format!("imageUrl is required: {}", e)))?;
        request.validate()?;
        Ok(request)
    }
}

/// Recognized text, exactly as the model produced it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct OcrResult {
    pub text: String,
}
