//! Gemini multimodal generation
//!
//! Sends one instruction plus one image reference to `generateContent` and asks for a
//! JSON response constrained to `{ "text": string }`. The image is never downloaded or
//! inspected here: remote URLs are passed by reference and `data:` URLs are inlined.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use yomiage_core::models::OcrResult;

use crate::google_auth::{AccessTokenError, GoogleCredentials};

const GENERATIVE_LANGUAGE_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Failed to send generation request: {0}")]
    Request(String),

    #[error("Generative model returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to obtain credentials: {0}")]
    Credentials(#[from] AccessTokenError),

    #[error("Invalid image reference: {0}")]
    InvalidImage(String),

    #[error("No output generated.")]
    NoOutput,

    #[error("Output does not match schema: {0}")]
    SchemaMismatch(String),
}

/// Multimodal model that turns an instruction plus an image into recognized text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_text(
        &self,
        instruction: &str,
        image_url: &str,
    ) -> Result<OcrResult, GenerationError>;

    fn model_name(&self) -> &str;
}

// generateContent request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(Blob),
    FileData(FileData),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Schema the model output must conform to
fn ocr_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "text": { "type": "STRING" }
        },
        "required": ["text"]
    })
}

/// Gemini client for Vertex AI or the Generative Language API
pub struct GeminiClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    credentials: GoogleCredentials,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    fn build_http_client() -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(240))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for Gemini: {}", e))
    }

    /// Vertex AI endpoint in `location`, authenticated with service account tokens
    pub fn vertex_ai(
        project_id: &str,
        location: &str,
        model: &str,
        credentials: GoogleCredentials,
    ) -> anyhow::Result<Self> {
        let base_url = format!("https://{}-aiplatform.googleapis.com", location);
        Self::vertex_ai_at(&base_url, project_id, location, model, credentials)
    }

    /// Vertex AI path layout against an explicit host
    pub fn vertex_ai_at(
        base_url: &str,
        project_id: &str,
        location: &str,
        model: &str,
        credentials: GoogleCredentials,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http_client: Self::build_http_client()?,
            endpoint: format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                project_id,
                location,
                model
            ),
            model: model.to_string(),
            credentials,
        })
    }

    /// Generative Language API, authenticated with an API key
    pub fn generative_language(api_key: &str, model: &str) -> anyhow::Result<Self> {
        Self::generative_language_at(GENERATIVE_LANGUAGE_BASE, api_key, model)
    }

    pub fn generative_language_at(
        base_url: &str,
        api_key: &str,
        model: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http_client: Self::build_http_client()?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            model: model.to_string(),
            credentials: GoogleCredentials::ApiKey(api_key.to_string()),
        })
    }

    fn build_request(instruction: &str, image_url: &str) -> Result<GenerateContentRequest, GenerationError> {
        Ok(GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::Text(instruction.to_string()), image_part(image_url)?],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: ocr_response_schema(),
            },
        })
    }
}

/// Encode an image URL as a request part
fn image_part(image_url: &str) -> Result<Part, GenerationError> {
    if let Some(rest) = image_url.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| GenerationError::InvalidImage("data URL without payload".to_string()))?;

        let mime_type = meta
            .split(';')
            .next()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();

        let data = if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
            payload.to_string()
        } else {
            use base64::Engine;
            let raw = urlencoding::decode_binary(payload.as_bytes());
            base64::engine::general_purpose::STANDARD.encode(raw.as_ref())
        };

        return Ok(Part::InlineData(Blob { mime_type, data }));
    }

    Ok(Part::FileData(FileData {
        mime_type: guess_image_mime(image_url).to_string(),
        file_uri: image_url.to_string(),
    }))
}

/// Guess an image MIME type from the URL path extension
fn guess_image_mime(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let extension = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("bmp") => "image/bmp",
        _ => DEFAULT_IMAGE_MIME,
    }
}

/// Pull the structured result out of a generateContent response
fn extract_result(response: GenerateContentResponse) -> Result<OcrResult, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        tracing::warn!(block_reason = %reason, "Gemini blocked the prompt");
        return Err(GenerationError::NoOutput);
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::NoOutput)?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        tracing::warn!(
            finish_reason = ?candidate.finish_reason,
            "Gemini returned a candidate without text"
        );
        return Err(GenerationError::NoOutput);
    }

    serde_json::from_str::<OcrResult>(&text)
        .map_err(|e| GenerationError::SchemaMismatch(e.to_string()))
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(
        &self,
        instruction: &str,
        image_url: &str,
    ) -> Result<OcrResult, GenerationError> {
        let body = Self::build_request(instruction, image_url)?;
        let start = std::time::Instant::now();

        let request = self.http_client.post(&self.endpoint).json(&body);
        let request = self.credentials.authorize(request).await?;

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::SchemaMismatch(format!("Invalid response body: {}", e)))?;

        let result = extract_result(parsed)?;

        tracing::info!(
            model = %self.model,
            text_len = result.text.chars().count(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Gemini generation completed"
        );

        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
