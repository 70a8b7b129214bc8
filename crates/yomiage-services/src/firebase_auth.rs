//! Firebase ID token and App Check token verification
//!
//! Both token kinds are RS256 JWTs signed by Google keys published as JWKS documents.
//! Keys are cached per key id with a TTL so verification normally needs no network call.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

pub const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const APP_CHECK_JWKS_URL: &str = "https://firebaseappcheck.googleapis.com/v1/jwks";

/// Minimum spacing between JWKS downloads triggered by unknown key ids
const MIN_REFETCH_INTERVAL_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to fetch JWKS: {0}")]
    JwksUnavailable(String),

    #[error("Signing key not found: {0}")]
    UnknownKey(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// JWKS (JSON Web Key Set) structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// JSON Web Key structure (RSA only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "kid")]
    pub key_id: Option<String>,
    #[serde(rename = "n")]
    pub modulus: Option<String>,
    #[serde(rename = "e")]
    pub exponent: Option<String>,
}

/// Cached public key with expiration
#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    expires_at: DateTime<Utc>,
}

/// RS256 verification against a JWKS endpoint with per-kid key caching
pub struct JwksVerifier {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedKey>>>,
    cache_ttl_seconds: i64,
    /// Time of the last JWKS download; held while a download is in progress
    last_fetch: Mutex<Option<DateTime<Utc>>>,
}

impl Debug for JwksVerifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("JwksVerifier")
            .field("jwks_url", &self.jwks_url)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .finish()
    }
}

impl JwksVerifier {
    /// # Arguments
    /// * `jwks_url` - URL of the JWKS document
    /// * `cache_ttl_seconds` - How long to cache keys (default: 3600 = 1 hour)
    pub fn new(jwks_url: impl Into<String>, cache_ttl_seconds: Option<i64>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for JWKS: {}", e))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl_seconds: cache_ttl_seconds.unwrap_or(3600),
            last_fetch: Mutex::new(None),
        })
    }

    async fn fetch_jwks(&self) -> Result<Jwks, TokenError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| TokenError::JwksUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TokenError::JwksUnavailable(format!(
                "JWKS endpoint returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TokenError::JwksUnavailable(format!("Failed to parse JWKS: {}", e)))
    }

    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, TokenError> {
        if jwk.key_type != "RSA" {
            return Err(TokenError::UnknownKey(format!(
                "Unsupported key type: {}",
                jwk.key_type
            )));
        }
        let n = jwk
            .modulus
            .as_ref()
            .ok_or_else(|| TokenError::UnknownKey("RSA key missing modulus".to_string()))?;
        let e = jwk
            .exponent
            .as_ref()
            .ok_or_else(|| TokenError::UnknownKey("RSA key missing exponent".to_string()))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| TokenError::UnknownKey(format!("Failed to create RSA key: {}", e)))
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache
            .get(kid)
            .filter(|cached| cached.expires_at > Utc::now())
            .map(|cached| cached.key.clone())
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, TokenError> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        let mut last_fetch = self.last_fetch.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        // Keys from a fetch younger than the cooldown are still live, so a
        // missing kid is not in the published set
        let cooldown =
            chrono::Duration::seconds(MIN_REFETCH_INTERVAL_SECS.min(self.cache_ttl_seconds));
        if let Some(fetched_at) = *last_fetch {
            if Utc::now() < fetched_at + cooldown {
                tracing::debug!(kid = %kid, "Unknown key id within JWKS refetch cooldown");
                return Err(TokenError::UnknownKey(format!(
                    "Key ID {} not found in JWKS",
                    kid
                )));
            }
        }

        // Cache miss or expired: refresh every key of the set at once
        let jwks = self.fetch_jwks().await?;
        let now = Utc::now();
        *last_fetch = Some(now);
        let expires_at = now + chrono::Duration::seconds(self.cache_ttl_seconds);

        let mut found = None;
        let mut cache = self.cache.write().await;
        cache.retain(|_, cached| cached.expires_at > now);
        for jwk in &jwks.keys {
            let Some(key_id) = jwk.key_id.as_deref() else {
                continue;
            };
            let key = match Self::jwk_to_decoding_key(jwk) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(kid = %key_id, error = %e, "Skipping unusable JWK");
                    continue;
                }
            };
            if key_id == kid {
                found = Some(key.clone());
            }
            cache.insert(key_id.to_string(), CachedKey { key, expires_at });
        }

        found.ok_or_else(|| TokenError::UnknownKey(format!("Key ID {} not found in JWKS", kid)))
    }

    /// Verify signature and standard claims, then decode the claims
    pub async fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<C, TokenError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("Invalid token header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "Unsupported algorithm: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("Token header has no kid".to_string()))?;
        let decoding_key = self.get_decoding_key(&kid).await?;

        let token_data = decode::<C>(token, &decoding_key, validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    TokenError::Invalid("Invalid token issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    TokenError::Invalid("Invalid token audience".to_string())
                }
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Identity established by a verified Firebase ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdClaims {
    sub: String,
    iat: i64,
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedUser, TokenError>;
}

/// Verifies Firebase Authentication ID tokens for one project
#[derive(Debug)]
pub struct FirebaseIdTokenVerifier {
    jwks: JwksVerifier,
    project_id: String,
}

impl FirebaseIdTokenVerifier {
    pub fn new(project_id: impl Into<String>, jwks: JwksVerifier) -> Self {
        Self {
            jwks,
            project_id: project_id.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseIdTokenVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedUser, TokenError> {
        let claims: FirebaseIdClaims = self.jwks.verify(token, &self.validation()).await?;

        if claims.sub.is_empty() || claims.sub.len() > 128 {
            return Err(TokenError::Invalid("Invalid token subject".to_string()));
        }
        if claims.iat > Utc::now().timestamp() + 60 {
            return Err(TokenError::Invalid("Token issued in the future".to_string()));
        }

        Ok(VerifiedUser {
            uid: claims.sub,
            email: claims.email,
        })
    }
}

/// Claims of a verified App Check token
#[derive(Debug, Clone, Deserialize)]
pub struct AppCheckClaims {
    /// Firebase app id of the attested client
    pub sub: String,
}

#[async_trait]
pub trait AppCheckTokenVerifier: Send + Sync {
    async fn verify_app_check_token(&self, token: &str) -> Result<AppCheckClaims, TokenError>;
}

/// Verifies Firebase App Check tokens for one project
#[derive(Debug)]
pub struct FirebaseAppCheckVerifier {
    jwks: JwksVerifier,
    project_number: String,
}

impl FirebaseAppCheckVerifier {
    pub fn new(project_number: impl Into<String>, jwks: JwksVerifier) -> Self {
        Self {
            jwks,
            project_number: project_number.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[format!("projects/{}", self.project_number)]);
        validation.set_issuer(&[format!(
            "https://firebaseappcheck.googleapis.com/{}",
            self.project_number
        )]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }
}

#[async_trait]
impl AppCheckTokenVerifier for FirebaseAppCheckVerifier {
    async fn verify_app_check_token(&self, token: &str) -> Result<AppCheckClaims, TokenError> {
        let claims: AppCheckClaims = self.jwks.verify(token, &self.validation()).await?;
        if claims.sub.is_empty() {
            return Err(TokenError::Invalid("App Check token has no app id".to_string()));
        }
        Ok(claims)
    }
}
