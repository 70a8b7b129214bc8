//! Text recognition: one instruction plus one image in, the model's `{ text }` out.

use std::sync::Arc;

use serde_json::Value;
use yomiage_core::error::GENERIC_INTERNAL_MESSAGE;
use yomiage_core::models::{OcrRequest, OcrResult};
use yomiage_core::{AppError, ErrorMetadata, PromptTemplate, PublicErrorKind};
use yomiage_services::{GenerationError, GenerativeModel};

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("No output generated.")]
    NoOutput,

    #[error("Generation failed: {0}")]
    Generation(#[source] GenerationError),
}

impl OcrError {
    /// Public kind this failure is reported as
    pub fn public_kind(&self) -> PublicErrorKind {
        match self {
            OcrError::InvalidArgument(_) => PublicErrorKind::InvalidArgument,
            OcrError::NoOutput | OcrError::Generation(_) => PublicErrorKind::Internal,
        }
    }
}

impl From<GenerationError> for OcrError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::NoOutput => OcrError::NoOutput,
            other => OcrError::Generation(other),
        }
    }
}

impl From<OcrError> for AppError {
    fn from(err: OcrError) -> Self {
        match err.public_kind() {
            PublicErrorKind::InvalidArgument => AppError::InvalidArgument(err.to_string()),
            _ => AppError::internal_with(GENERIC_INTERNAL_MESSAGE, err),
        }
    }
}

pub struct OcrService {
    model: Arc<dyn GenerativeModel>,
    prompt: PromptTemplate,
}

impl OcrService {
    pub fn new(model: Arc<dyn GenerativeModel>, prompt: PromptTemplate) -> Self {
        Self { model, prompt }
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Validate the payload and run one generation request
    pub async fn recognize(&self, data: Value) -> Result<OcrResult, OcrError> {
        let request = OcrRequest::from_payload(data)
            .map_err(|e| OcrError::InvalidArgument(e.client_message()))?;

        tracing::debug!(
            model = %self.model.model_name(),
            prompt_version = %self.prompt.version(),
            image_scheme = %request.image_url.split(':').next().unwrap_or_default(),
            "Running text recognition"
        );

        let result = self
            .model
            .generate_text(self.prompt.render(), &request.image_url)
            .await
            .map_err(OcrError::from)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Text(&'static str),
        NoOutput,
        Upstream,
    }

    struct FakeModel {
        reply: Reply,
        calls: AtomicUsize,
        last_instruction: Mutex<Option<String>>,
    }

    impl FakeModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_instruction: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate_text(
            &self,
            instruction: &str,
            _image_url: &str,
        ) -> Result<OcrResult, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_instruction.lock().unwrap() = Some(instruction.to_string());
            match self.reply {
                Reply::Text(text) => Ok(OcrResult {
                    text: text.to_string(),
                }),
                Reply::NoOutput => Err(GenerationError::NoOutput),
                Reply::Upstream => Err(GenerationError::Upstream {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "fake-model"
        }
    }

    #[tokio::test]
    async fn test_returns_model_output_verbatim() {
        let model = FakeModel::new(Reply::Text("hello"));
        let service = OcrService::new(model.clone(), PromptTemplate::default());

        let result = service
            .recognize(json!({"imageUrl": "https://example.com/a.png"}))
            .await
            .unwrap();

        assert_eq!(result, OcrResult { text: "hello".to_string() });
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            model.last_instruction.lock().unwrap().as_deref(),
            Some(PromptTemplate::default().render())
        );
    }

    #[tokio::test]
    async fn test_no_output_is_internal() {
        let model = FakeModel::new(Reply::NoOutput);
        let service = OcrService::new(model.clone(), PromptTemplate::default());

        let err = service
            .recognize(json!({"imageUrl": "https://example.com/a.png"}))
            .await
            .unwrap_err();

        assert!(matches!(err, OcrError::NoOutput));
        assert_eq!(err.public_kind(), PublicErrorKind::Internal);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let app_error = AppError::from(err);
        assert_eq!(app_error.client_message(), "INTERNAL");
        assert!(app_error.detailed_message().contains("No output generated."));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_internal() {
        let service = OcrService::new(FakeModel::new(Reply::Upstream), PromptTemplate::default());

        let err = service
            .recognize(json!({"imageUrl": "gs://bucket/page.jpg"}))
            .await
            .unwrap_err();

        assert_eq!(err.public_kind(), PublicErrorKind::Internal);
        assert!(!AppError::from(err).client_message().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_invalid_payload_makes_no_model_call() {
        let model = FakeModel::new(Reply::Text("unused"));
        let service = OcrService::new(model.clone(), PromptTemplate::default());

        for data in [json!({}), json!({"imageUrl": ""}), json!({"imageUrl": 7})] {
            let err = service.recognize(data).await.unwrap_err();
            assert_eq!(err.public_kind(), PublicErrorKind::InvalidArgument);
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_prompt_is_sent() {
        let model = FakeModel::new(Reply::Text("ok"));
        let service = OcrService::new(model.clone(), PromptTemplate::new("v2", "Read the page."));

        service
            .recognize(json!({"imageUrl": "https://example.com/a.png"}))
            .await
            .unwrap();

        assert_eq!(
            model.last_instruction.lock().unwrap().as_deref(),
            Some("Read the page.")
        );
        assert_eq!(service.prompt().version(), "v2");
    }
}
