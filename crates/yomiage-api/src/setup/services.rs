//! Client initialization and application state setup

use anyhow::{Context, Result};
use std::sync::Arc;
use yomiage_core::{Config, PromptTemplate};
use yomiage_services::{
    firebase_auth::{APP_CHECK_JWKS_URL, SECURE_TOKEN_JWKS_URL},
    AccessTokenProvider, AppCheckTokenVerifier, FirebaseAppCheckVerifier,
    FirebaseIdTokenVerifier, GeminiClient, GenerativeModel, GoogleCredentials,
    GoogleTextToSpeech, JwksVerifier, MetadataTokenProvider, ServiceAccountTokenProvider,
    SpeechSynthesizer,
};
use yomiage_storage::Storage;

use crate::auth::middleware::AuthState;
use crate::services::{OcrService, SpeechService};
use crate::state::AppState;

/// Build every long-lived client once and wire them into the application state
pub async fn initialize_services(
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    // One token cache shared by Vertex AI and Text-to-Speech
    let token_provider = build_token_provider(config)?;

    let model = build_generative_model(config, token_provider.clone())?;
    let synthesizer = build_synthesizer(config, token_provider)?;

    let prompt = PromptTemplate::load(config.ocr_prompt_path(), config.ocr_prompt_version())
        .context("Failed to load OCR prompt template")?;
    tracing::info!(
        prompt_version = %prompt.version(),
        custom = config.ocr_prompt_path().is_some(),
        "OCR prompt template loaded"
    );

    let auth = build_auth_state(config)?;

    let ocr = Arc::new(OcrService::new(model, prompt));
    let speech = Arc::new(SpeechService::new(synthesizer, storage.clone()));

    Ok(Arc::new(AppState {
        config: config.clone(),
        ocr,
        speech,
        storage,
        auth,
    }))
}

fn build_token_provider(config: &Config) -> Result<Arc<dyn AccessTokenProvider>> {
    match config.google_application_credentials() {
        Some(path) => {
            let provider = ServiceAccountTokenProvider::from_file(path)
                .context("Failed to load GOOGLE_APPLICATION_CREDENTIALS")?;
            tracing::info!(
                client_email = %provider.client_email(),
                "Using service account key for Google API access tokens"
            );
            Ok(Arc::new(provider))
        }
        None => {
            tracing::info!("Using metadata server for Google API access tokens");
            Ok(Arc::new(
                MetadataTokenProvider::new().context("Failed to create token provider")?,
            ))
        }
    }
}

fn build_generative_model(
    config: &Config,
    token_provider: Arc<dyn AccessTokenProvider>,
) -> Result<Arc<dyn GenerativeModel>> {
    let client = match config.gemini_api_key() {
        Some(api_key) => {
            tracing::info!(model = %config.gemini_model(), "Using Generative Language API");
            GeminiClient::generative_language(api_key, config.gemini_model())?
        }
        None => {
            tracing::info!(
                model = %config.gemini_model(),
                project_id = %config.project_id(),
                location = %config.location_id(),
                "Using Vertex AI"
            );
            GeminiClient::vertex_ai(
                config.project_id(),
                config.location_id(),
                config.gemini_model(),
                GoogleCredentials::AccessToken(token_provider),
            )?
        }
    };
    Ok(Arc::new(client))
}

fn build_synthesizer(
    config: &Config,
    token_provider: Arc<dyn AccessTokenProvider>,
) -> Result<Arc<dyn SpeechSynthesizer>> {
    let credentials = match config.google_api_key() {
        Some(api_key) => GoogleCredentials::ApiKey(api_key.to_string()),
        None => GoogleCredentials::AccessToken(token_provider),
    };
    let client = GoogleTextToSpeech::new(config.voice().clone(), credentials)?;
    tracing::info!(
        language_code = %config.voice().language_code,
        voice = %config.voice().name,
        ssml_gender = %config.voice().ssml_gender,
        "Text-to-Speech client initialized"
    );
    Ok(Arc::new(client))
}

fn build_auth_state(config: &Config) -> Result<AuthState> {
    let ttl = i64::try_from(config.jwks_cache_ttl_secs()).ok();

    let id_tokens = Arc::new(FirebaseIdTokenVerifier::new(
        config.project_id(),
        JwksVerifier::new(SECURE_TOKEN_JWKS_URL, ttl)?,
    ));

    let app_check: Option<Arc<dyn AppCheckTokenVerifier>> = if config.enforce_app_check() {
        let project_number = config.project_number().ok_or_else(|| {
            anyhow::anyhow!("GCP_PROJECT_NUMBER must be set when ENFORCE_APP_CHECK is enabled")
        })?;
        Some(Arc::new(FirebaseAppCheckVerifier::new(
            project_number,
            JwksVerifier::new(APP_CHECK_JWKS_URL, ttl)?,
        )))
    } else {
        None
    };

    tracing::info!(
        project_id = %config.project_id(),
        app_check = app_check.is_some(),
        jwks_cache_ttl_secs = config.jwks_cache_ttl_secs(),
        "Firebase token verification configured"
    );

    Ok(AuthState {
        id_tokens,
        app_check,
    })
}
