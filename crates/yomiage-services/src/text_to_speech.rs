//! Google Cloud Text-to-Speech client

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use yomiage_core::VoiceConfig;

use crate::google_auth::{AccessTokenError, GoogleCredentials};

const API_BASE: &str = "https://texttospeech.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Failed to send synthesis request: {0}")]
    Request(String),

    #[error("Text-to-Speech returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to obtain credentials: {0}")]
    Credentials(#[from] AccessTokenError),

    #[error("Invalid synthesis response: {0}")]
    InvalidResponse(String),
}

/// Turns text into MP3 audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize_mp3(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

pub struct GoogleTextToSpeech {
    http_client: reqwest::Client,
    base_url: String,
    voice: VoiceConfig,
    credentials: GoogleCredentials,
}

impl Debug for GoogleTextToSpeech {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GoogleTextToSpeech")
            .field("base_url", &self.base_url)
            .field("voice", &self.voice)
            .finish()
    }
}

impl GoogleTextToSpeech {
    pub fn new(voice: VoiceConfig, credentials: GoogleCredentials) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for Text-to-Speech: {}", e))?;

        Ok(Self {
            http_client,
            base_url: API_BASE.to_string(),
            voice,
            credentials,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTextToSpeech {
    async fn synthesize_mp3(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.voice.language_code,
                name: &self.voice.name,
                ssml_gender: &self.voice.ssml_gender,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        let start = std::time::Instant::now();

        let request = self
            .http_client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .json(&body);
        let request = self.credentials.authorize(request).await?;

        let response = request
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SynthesisError::Upstream {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

        if parsed.audio_content.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "response contained no audioContent".to_string(),
            ));
        }

        let audio = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| SynthesisError::InvalidResponse(format!("audioContent is not base64: {}", e)))?;

        tracing::info!(
            voice = %self.voice.name,
            text_chars = text.chars().count(),
            audio_bytes = audio.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Speech synthesis completed"
        );

        Ok(audio)
    }
}
