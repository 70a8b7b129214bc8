//! Configuration validation
//!
//! Validates configuration at startup to catch misconfigurations early.

use anyhow::Result;
use yomiage_core::Config;

/// Validate configuration, failing fast on anything that would break or weaken the
/// callable endpoints at runtime.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if is_production && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Please set specific allowed origins via CORS_ORIGINS environment variable."
        ));
    }

    if !config.enforce_app_check() {
        tracing::warn!("App Check enforcement disabled - only use this against emulators");
    }

    if config.function_timeout_secs() > 3600 {
        tracing::warn!(
            function_timeout_secs = config.function_timeout_secs(),
            "FUNCTION_TIMEOUT_SECS is above one hour"
        );
    }

    if config.gemini_api_key().is_some() && is_production {
        tracing::warn!("GEMINI_API_KEY set in production - Gemini calls bypass Vertex AI");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use yomiage_core::ServiceConfig;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_service_config(ServiceConfig::from_vars(&vars).unwrap())
    }

    #[test]
    fn test_development_accepts_wildcard_cors() {
        let config = config(&[
            ("GCP_PROJECT_ID", "yomiage-dev"),
            ("GCS_BUCKET", "bucket"),
            ("ENFORCE_APP_CHECK", "false"),
        ]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_production_requires_app_check() {
        let config = config(&[
            ("ENVIRONMENT", "production"),
            ("GCP_PROJECT_ID", "yomiage"),
            ("GCP_PROJECT_NUMBER", "42"),
            ("GCS_BUCKET", "bucket"),
            ("CORS_ORIGINS", "https://yomiage.app"),
            ("ENFORCE_APP_CHECK", "false"),
        ]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_production_with_origins() {
        let config = config(&[
            ("ENVIRONMENT", "production"),
            ("GCP_PROJECT_ID", "yomiage"),
            ("GCP_PROJECT_NUMBER", "42"),
            ("GCS_BUCKET", "bucket"),
            ("CORS_ORIGINS", "https://yomiage.app"),
        ]);
        assert!(validate_config(&config).is_ok());
    }
}
