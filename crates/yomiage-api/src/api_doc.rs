//! OpenAPI documentation.
//! Callable payloads are documented with their `data` / `result` envelopes.

use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::error;
use crate::handlers;
use yomiage_core::models;

/// `{"data": {"imageUrl": ...}}`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct OcrCallableRequest {
    pub data: models::OcrRequest,
}

/// `{"result": {"text": ...}}`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct OcrCallableResponse {
    pub result: models::OcrResult,
}

/// `{"data": {"text": ...}}`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SpeechCallableRequest {
    pub data: models::SpeechRequest,
}

/// `{"result": {"audioUrl": ...}}`
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SpeechCallableResponse {
    pub result: models::SpeechResult,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Yomiage API",
        version = "0.1.0",
        description = "Callable functions for reading photographed Japanese text: OCR through Gemini and read-aloud through Cloud Text-to-Speech. Requests carry a Firebase ID token (Authorization: Bearer) and an App Check token (X-Firebase-AppCheck)."
    ),
    paths(
        handlers::ocr::generate_ocm,
        handlers::speech::text_to_speech,
    ),
    components(
        schemas(
            models::OcrRequest,
            models::OcrResult,
            models::SpeechRequest,
            models::SpeechResult,
            OcrCallableRequest,
            OcrCallableResponse,
            SpeechCallableRequest,
            SpeechCallableResponse,
            error::CallableErrorBody,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "ocr", description = "Text recognition from an image URL"),
        (name = "speech", description = "Japanese speech synthesis stored as MP3")
    )
)]
pub struct ApiDoc;
