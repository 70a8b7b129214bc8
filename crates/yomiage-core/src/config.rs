//! Configuration module
//!
//! Settings are read once at startup from the process environment (after loading
//! `.env`). Every client built from this configuration is immutable afterwards.

use std::collections::HashMap;
use std::env;

use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOCATION_ID: &str = "us-central1";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
const DEFAULT_MAX_INSTANCES: usize = 100;
const DEFAULT_FUNCTION_TIMEOUT_SECS: u64 = 300;
const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600;

/// Voice selection sent with every synthesis request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceConfig {
    pub language_code: String,
    pub name: String,
    pub ssml_gender: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language_code: "ja-JP".to_string(),
            name: "ja-JP-Standard-B".to_string(),
            ssml_gender: "FEMALE".to_string(),
        }
    }
}

/// Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Google Cloud project
    pub project_id: String,
    pub project_number: Option<String>,
    pub location_id: String,
    // Generative model
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
    // Text-to-Speech
    pub google_api_key: Option<String>,
    /// Service account key file for OAuth tokens; the metadata server is used when unset
    pub google_application_credentials: Option<String>,
    pub voice: VoiceConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub gcs_bucket: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Auth
    pub enforce_app_check: bool,
    pub jwks_cache_ttl_secs: u64,
    // Per-operation limits
    pub max_instances: usize,
    pub function_timeout_secs: u64,
    // OCR prompt
    pub ocr_prompt_path: Option<String>,
    pub ocr_prompt_version: Option<String>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config(Box<ServiceConfig>);

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn from_service_config(config: ServiceConfig) -> Self {
        Config(Box::new(config))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.0.validate()
    }

    pub fn as_service(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn server_port(&self) -> u16 {
        self.0.server_port
    }

    pub fn environment(&self) -> &str {
        &self.0.environment
    }

    pub fn is_production(&self) -> bool {
        is_production_env(&self.0.environment)
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.cors_origins
    }

    pub fn project_id(&self) -> &str {
        &self.0.project_id
    }

    pub fn project_number(&self) -> Option<&str> {
        self.0.project_number.as_deref()
    }

    pub fn location_id(&self) -> &str {
        &self.0.location_id
    }

    pub fn gemini_model(&self) -> &str {
        &self.0.gemini_model
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.0.gemini_api_key.as_deref()
    }

    pub fn google_api_key(&self) -> Option<&str> {
        self.0.google_api_key.as_deref()
    }

    pub fn google_application_credentials(&self) -> Option<&str> {
        self.0.google_application_credentials.as_deref()
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.0.voice
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.0.storage_backend
    }

    pub fn gcs_bucket(&self) -> Option<&str> {
        self.0.gcs_bucket.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.0.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.0.local_storage_base_url.as_deref()
    }

    pub fn enforce_app_check(&self) -> bool {
        self.0.enforce_app_check
    }

    pub fn jwks_cache_ttl_secs(&self) -> u64 {
        self.0.jwks_cache_ttl_secs
    }

    pub fn max_instances(&self) -> usize {
        self.0.max_instances
    }

    pub fn function_timeout_secs(&self) -> u64 {
        self.0.function_timeout_secs
    }

    pub fn ocr_prompt_path(&self) -> Option<&str> {
        self.0.ocr_prompt_path.as_deref()
    }

    pub fn ocr_prompt_version(&self) -> Option<&str> {
        self.0.ocr_prompt_version.as_deref()
    }
}

/// Whether an environment name denotes production
pub fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build the configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = get("ENVIRONMENT")
            .or_else(|| get("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = get("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_env(&environment) && cors_origins_str == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = get("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let project_id = get("GCP_PROJECT_ID")
            .or_else(|| get("GOOGLE_CLOUD_PROJECT"))
            .ok_or_else(|| anyhow::anyhow!("GCP_PROJECT_ID or GOOGLE_CLOUD_PROJECT must be set"))?;

        let storage_backend = match get("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Gcs,
        };

        let defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            language_code: get("TTS_LANGUAGE_CODE").unwrap_or(defaults.language_code),
            name: get("TTS_VOICE_NAME").unwrap_or(defaults.name),
            ssml_gender: get("TTS_SSML_GENDER")
                .map(|g| g.to_uppercase())
                .unwrap_or(defaults.ssml_gender),
        };

        let enforce_app_check = get("ENFORCE_APP_CHECK")
            .map(|v| v.parse::<bool>().unwrap_or(true))
            .unwrap_or(true);

        Ok(ServiceConfig {
            server_port,
            environment,
            cors_origins,
            project_id,
            project_number: get("GCP_PROJECT_NUMBER"),
            location_id: get("LOCATION_ID").unwrap_or_else(|| DEFAULT_LOCATION_ID.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_key: get("GEMINI_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            google_application_credentials: get("GOOGLE_APPLICATION_CREDENTIALS"),
            voice,
            storage_backend,
            gcs_bucket: get("GCS_BUCKET").or_else(|| get("STORAGE_BUCKET")),
            local_storage_path: get("LOCAL_STORAGE_PATH"),
            local_storage_base_url: get("LOCAL_STORAGE_BASE_URL"),
            enforce_app_check,
            jwks_cache_ttl_secs: get("JWKS_CACHE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JWKS_CACHE_TTL_SECS),
            max_instances: get("MAX_INSTANCES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_INSTANCES),
            function_timeout_secs: get("FUNCTION_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FUNCTION_TIMEOUT_SECS),
            ocr_prompt_path: get("OCR_PROMPT_PATH"),
            ocr_prompt_version: get("OCR_PROMPT_VERSION"),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_instances == 0 {
            return Err(anyhow::anyhow!("MAX_INSTANCES must be greater than 0"));
        }

        if self.function_timeout_secs == 0 {
            return Err(anyhow::anyhow!("FUNCTION_TIMEOUT_SECS must be greater than 0"));
        }

        if self.enforce_app_check && self.project_number.is_none() {
            return Err(anyhow::anyhow!(
                "GCP_PROJECT_NUMBER must be set when ENFORCE_APP_CHECK is enabled"
            ));
        }

        match self.storage_backend {
            StorageBackend::Gcs => {
                if self.gcs_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "GCS_BUCKET or STORAGE_BUCKET must be set when using GCS storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if is_production_env(&self.environment) && !self.enforce_app_check {
            return Err(anyhow::anyhow!(
                "ENFORCE_APP_CHECK cannot be disabled in production"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "yomiage-dev"),
            ("GCP_PROJECT_NUMBER", "123456"),
            ("GCS_BUCKET", "yomiage-dev.appspot.com"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.location_id, "us-central1");
        assert_eq!(config.gemini_model, "gemini-2.5-flash-preview-05-20");
        assert_eq!(config.voice, VoiceConfig::default());
        assert_eq!(config.storage_backend, StorageBackend::Gcs);
        assert_eq!(config.max_instances, 100);
        assert_eq!(config.function_timeout_secs, 300);
        assert!(config.enforce_app_check);
        assert!(config.google_application_credentials.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_application_credentials_path() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "yomiage-dev"),
            ("GCP_PROJECT_NUMBER", "123456"),
            ("GCS_BUCKET", "yomiage-dev.appspot.com"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json"),
        ]))
        .unwrap();

        let config = Config::from_service_config(config);
        assert_eq!(config.google_application_credentials(), Some("/secrets/sa.json"));
    }

    #[test]
    fn test_project_id_required() {
        let result = ServiceConfig::from_vars(&vars(&[("GCS_BUCKET", "b")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_project_id_fallback() {
        let config = ServiceConfig::from_vars(&vars(&[("GOOGLE_CLOUD_PROJECT", "fallback")]))
            .unwrap();
        assert_eq!(config.project_id, "fallback");
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let result = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("ENVIRONMENT", "production"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_bucket_for_gcs() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("GCP_PROJECT_NUMBER", "1"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_project_number_with_app_check() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("GCS_BUCKET", "b"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());

        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("GCS_BUCKET", "b"),
            ("ENFORCE_APP_CHECK", "false"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_backend_needs_path_and_base_url() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("ENFORCE_APP_CHECK", "false"),
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/yomiage"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_voice_overrides() {
        let config = ServiceConfig::from_vars(&vars(&[
            ("GCP_PROJECT_ID", "p"),
            ("TTS_LANGUAGE_CODE", "en-US"),
            ("TTS_VOICE_NAME", "en-US-Standard-C"),
            ("TTS_SSML_GENDER", "female"),
        ]))
        .unwrap();
        assert_eq!(config.voice.language_code, "en-US");
        assert_eq!(config.voice.name, "en-US-Standard-C");
        assert_eq!(config.voice.ssml_gender, "FEMALE");
    }
}
