//! Test helpers: build AppState and router for integration tests.
//!
//! Outbound clients and token verifiers are in-memory fakes; storage is the real local
//! backend in a temp directory unless a test swaps it out.

#![allow(dead_code)]

pub mod auth;
pub mod fakes;

use axum_test::TestServer;
use fakes::{FakeModel, FakeSynthesizer, ModelReply};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use yomiage_api::auth::middleware::AuthState;
use yomiage_api::services::{Clock, OcrService, SpeechService};
use yomiage_api::setup_routes;
use yomiage_api::state::AppState;
use yomiage_core::{Config, PromptTemplate, ServiceConfig};
use yomiage_services::AppCheckTokenVerifier;
use yomiage_storage::{LocalStorage, Storage};

pub const STORAGE_BASE_URL: &str = "http://localhost:9199/yomiage-test";

/// Fixed clock value used for stored object names
pub const TEST_MILLIS: i64 = 1_718_000_000_000;

/// Test application: server plus handles on the fakes it was built with.
pub struct TestApp {
    pub server: TestServer,
    pub model: Arc<FakeModel>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub storage: Arc<dyn Storage>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> &std::path::Path {
        self._temp_dir.path()
    }
}

/// Knobs for one test application
pub struct TestAppOptions {
    pub model_reply: ModelReply,
    pub synthesis_fails: bool,
    pub storage: Option<Arc<dyn Storage>>,
    pub enforce_app_check: bool,
    pub clock: Option<Clock>,
    pub max_instances: usize,
    pub function_timeout_secs: u64,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            model_reply: ModelReply::Text("こんにちは世界".to_string()),
            synthesis_fails: false,
            storage: None,
            enforce_app_check: true,
            clock: None,
            max_instances: 4,
            function_timeout_secs: 30,
        }
    }
}

pub fn test_config(temp_dir: &TempDir, options: &TestAppOptions) -> Config {
    let enforce_app_check = options.enforce_app_check;
    let vars: HashMap<String, String> = [
        ("ENVIRONMENT", "development"),
        ("GCP_PROJECT_ID", "yomiage-test"),
        ("GCP_PROJECT_NUMBER", "123456"),
        ("STORAGE_BACKEND", "local"),
        ("LOCAL_STORAGE_BASE_URL", STORAGE_BASE_URL),
        ("ENFORCE_APP_CHECK", if enforce_app_check { "true" } else { "false" }),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .chain([
        (
            "LOCAL_STORAGE_PATH".to_string(),
            temp_dir.path().to_string_lossy().to_string(),
        ),
        ("MAX_INSTANCES".to_string(), options.max_instances.to_string()),
        (
            "FUNCTION_TIMEOUT_SECS".to_string(),
            options.function_timeout_secs.to_string(),
        ),
    ])
    .collect();

    Config::from_service_config(
        ServiceConfig::from_vars(&vars).expect("Failed to build test configuration"),
    )
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestAppOptions::default()).await
}

pub async fn setup_test_app_with(options: TestAppOptions) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&temp_dir, &options);
    config.validate().expect("Test configuration is invalid");

    let storage: Arc<dyn Storage> = match options.storage {
        Some(storage) => storage,
        None => Arc::new(
            LocalStorage::new(temp_dir.path(), STORAGE_BASE_URL.to_string())
                .await
                .expect("Failed to create local storage"),
        ),
    };

    let model = Arc::new(FakeModel::new(options.model_reply));
    let synthesizer = Arc::new(FakeSynthesizer::new(options.synthesis_fails));

    let clock: Clock = match options.clock {
        Some(clock) => clock,
        None => Arc::new(|| TEST_MILLIS),
    };
    let speech = SpeechService::new(synthesizer.clone(), storage.clone()).with_clock(clock);

    let app_check: Option<Arc<dyn AppCheckTokenVerifier>> = if options.enforce_app_check {
        Some(Arc::new(auth::FakeAppCheckVerifier))
    } else {
        None
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        ocr: Arc::new(OcrService::new(model.clone(), PromptTemplate::default())),
        speech: Arc::new(speech),
        storage: storage.clone(),
        auth: AuthState {
            id_tokens: Arc::new(auth::FakeIdTokenVerifier),
            app_check,
        },
    });

    let router = setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        model,
        synthesizer,
        storage,
        _temp_dir: temp_dir,
    }
}
