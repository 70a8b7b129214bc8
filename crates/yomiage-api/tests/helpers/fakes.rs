use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use yomiage_core::models::OcrResult;
use yomiage_services::{GenerationError, GenerativeModel, SpeechSynthesizer, SynthesisError};
use yomiage_storage::{Storage, StorageBackend, StorageError, StorageResult};

pub const FAKE_MP3: &[u8] = b"ID3\x04\x00fake-mp3";

/// What the fake model answers
pub enum ModelReply {
    Text(String),
    NoOutput,
    SchemaMismatch,
}

pub struct FakeModel {
    reply: ModelReply,
    calls: AtomicUsize,
    image_urls: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(reply: ModelReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            image_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.image_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate_text(
        &self,
        _instruction: &str,
        image_url: &str,
    ) -> Result<OcrResult, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image_urls.lock().unwrap().push(image_url.to_string());
        match &self.reply {
            ModelReply::Text(text) => Ok(OcrResult { text: text.clone() }),
            ModelReply::NoOutput => Err(GenerationError::NoOutput),
            ModelReply::SchemaMismatch => Err(GenerationError::SchemaMismatch(
                "missing field `text`".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        "fake-gemini"
    }
}

pub struct FakeSynthesizer {
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize_mp3(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(SynthesisError::Upstream {
                status: 429,
                body: "quota exhausted for project yomiage".to_string(),
            });
        }
        Ok(FAKE_MP3.to_vec())
    }
}

/// Storage whose writes always fail
pub struct BrokenStorage {
    pub attempts: AtomicUsize,
}

impl BrokenStorage {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Storage for BrokenStorage {
    async fn upload_with_key(
        &self,
        _storage_key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::UploadFailed(
            "403 storage.objects.create denied".to_string(),
        ))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("https://storage.googleapis.com/broken/{}", storage_key)
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Err(StorageError::BackendError("bucket unreachable".to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}

/// Local-style storage whose writes take `delay` and which records peak concurrency
pub struct SlowStorage {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for SlowStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(self.public_url(storage_key))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("https://storage.googleapis.com/slow/{}", storage_key)
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
