//! Speech synthesis: text in, MP3 written to storage, retrieval URL out.

use std::sync::Arc;

use serde_json::Value;
use yomiage_core::models::{SpeechRequest, SpeechResult};
use yomiage_core::{AppError, ErrorMetadata, PublicErrorKind};
use yomiage_services::{SpeechSynthesizer, SynthesisError};
use yomiage_storage::{audio_object_key, Storage, StorageError, AUDIO_CONTENT_TYPE};

/// Public message for every failed conversion
pub const SPEECH_FAILED_MESSAGE: &str = "音声変換処理に失敗しました";

/// Millisecond wall clock used to name stored objects
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] SynthesisError),

    #[error("Storing audio failed: {0}")]
    Storage(#[source] StorageError),
}

impl SpeechError {
    pub fn public_kind(&self) -> PublicErrorKind {
        match self {
            SpeechError::InvalidArgument(_) => PublicErrorKind::InvalidArgument,
            SpeechError::Synthesis(_) | SpeechError::Storage(_) => PublicErrorKind::Internal,
        }
    }
}

impl From<SpeechError> for AppError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::InvalidArgument(message) => AppError::InvalidArgument(message),
            other => AppError::internal_with(SPEECH_FAILED_MESSAGE, other),
        }
    }
}

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    storage: Arc<dyn Storage>,
    clock: Clock,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, storage: Arc<dyn Storage>) -> Self {
        Self {
            synthesizer,
            storage,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Synthesize `data.text`, store the MP3 under the caller's folder and return its URL.
    ///
    /// Nothing is written when synthesis fails; invalid input reaches neither backend.
    pub async fn synthesize(
        &self,
        data: &Value,
        user_id: Option<&str>,
    ) -> Result<SpeechResult, SpeechError> {
        let request = SpeechRequest::from_payload(data)
            .map_err(|e| SpeechError::InvalidArgument(e.client_message()))?;

        let audio = self
            .synthesizer
            .synthesize_mp3(&request.text)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Text-to-Speech request failed");
                SpeechError::Synthesis(e)
            })?;

        let storage_key = audio_object_key(user_id, (self.clock)());
        tracing::debug!(storage_key = %storage_key, audio_bytes = audio.len(), "Storing synthesized audio");

        let audio_url = self
            .storage
            .upload_with_key(&storage_key, audio, AUDIO_CONTENT_TYPE)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, storage_key = %storage_key, "Failed to store audio");
                SpeechError::Storage(e)
            })?;

        tracing::debug!(audio_url = %audio_url, "Audio stored");

        Ok(SpeechResult { audio_url })
    }
}
