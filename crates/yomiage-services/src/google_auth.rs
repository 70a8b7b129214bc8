//! Google API credentials
//!
//! Outbound calls to Google APIs authenticate either with an API key (`?key=`) or with
//! an OAuth access token. Tokens come from a service account key file named by
//! `GOOGLE_APPLICATION_CREDENTIALS` when one is configured, otherwise from the instance
//! metadata server, and are cached until shortly before they expire.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const METADATA_BASE: &str = "http://metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Lifetime requested for self-signed assertions
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum AccessTokenError {
    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Invalid service account credentials: {0}")]
    Credentials(String),
}

/// Source of OAuth access tokens
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AccessTokenError>;
}

/// How a client authenticates against a Google API
#[derive(Clone)]
pub enum GoogleCredentials {
    ApiKey(String),
    AccessToken(Arc<dyn AccessTokenProvider>),
}

impl Debug for GoogleCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GoogleCredentials::ApiKey(_) => f.write_str("GoogleCredentials::ApiKey(..)"),
            GoogleCredentials::AccessToken(_) => f.write_str("GoogleCredentials::AccessToken(..)"),
        }
    }
}

impl GoogleCredentials {
    /// Attach the credential to an outgoing request
    pub async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, AccessTokenError> {
        match self {
            GoogleCredentials::ApiKey(key) => Ok(request.query(&[("key", key.as_str())])),
            GoogleCredentials::AccessToken(provider) => {
                let token = provider.access_token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl TryFrom<TokenResponse> for CachedToken {
    type Error = AccessTokenError;

    fn try_from(parsed: TokenResponse) -> Result<Self, Self::Error> {
        if parsed.access_token.is_empty() {
            return Err(AccessTokenError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(parsed.expires_in),
        })
    }
}

/// Serve the cached token or run `fetch` once, holding the write lock so concurrent
/// callers share a single refresh
async fn cached_or_refresh<F, Fut>(
    cache: &RwLock<Option<CachedToken>>,
    source: &str,
    fetch: F,
) -> Result<String, AccessTokenError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedToken, AccessTokenError>>,
{
    let refresh_after = Utc::now() + chrono::Duration::seconds(REFRESH_MARGIN_SECS);

    {
        let cache = cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > refresh_after {
                return Ok(cached.token.clone());
            }
        }
    }

    let mut cache = cache.write().await;
    // Another task may have refreshed while we waited for the lock
    if let Some(cached) = cache.as_ref() {
        if cached.expires_at > refresh_after {
            return Ok(cached.token.clone());
        }
    }

    let fresh = fetch().await?;
    tracing::debug!(source = source, expires_at = %fresh.expires_at, "Fetched access token");
    let token = fresh.token.clone();
    *cache = Some(fresh);
    Ok(token)
}

async fn read_token_response(response: reqwest::Response) -> Result<CachedToken, AccessTokenError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AccessTokenError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|e| AccessTokenError::InvalidResponse(e.to_string()))?;
    CachedToken::try_from(parsed)
}

fn token_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client for token requests: {}", e))
}

/// Access tokens of the default service account from the metadata server
pub struct MetadataTokenProvider {
    http_client: reqwest::Client,
    base_url: String,
    cache: RwLock<Option<CachedToken>>,
}

impl Debug for MetadataTokenProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MetadataTokenProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl MetadataTokenProvider {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            http_client: token_http_client()?,
            base_url: METADATA_BASE.to_string(),
            cache: RwLock::new(None),
        })
    }

    /// Override the metadata server address (emulators, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_token(&self) -> Result<CachedToken, AccessTokenError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, TOKEN_PATH))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AccessTokenError::Request(e.to_string()))?;

        read_token_response(response).await
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String, AccessTokenError> {
        cached_or_refresh(&self.cache, "metadata", || self.fetch_token()).await
    }
}

/// Fields of a service account key file that token exchange needs
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Access tokens minted from a service account key via the JWT bearer grant
pub struct ServiceAccountTokenProvider {
    http_client: reqwest::Client,
    client_email: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    token_uri: String,
    scope: String,
    cache: RwLock<Option<CachedToken>>,
}

impl Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountTokenProvider {
    /// Load a key file such as the one named by `GOOGLE_APPLICATION_CREDENTIALS`
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read credentials file {}: {}", path.display(), e)
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(contents)
            .map_err(|e| AccessTokenError::Credentials(e.to_string()))?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AccessTokenError::Credentials(format!("private_key: {}", e)))?;

        Ok(Self {
            http_client: token_http_client()?,
            client_email: key.client_email,
            key_id: key.private_key_id,
            signing_key,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            cache: RwLock::new(None),
        })
    }

    /// Override the token endpoint (emulators, tests)
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn signed_assertion(&self) -> Result<String, AccessTokenError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| AccessTokenError::Credentials(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch_token(&self) -> Result<CachedToken, AccessTokenError> {
        let assertion = self.signed_assertion()?;
        let response = self
            .http_client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AccessTokenError::Request(e.to_string()))?;

        read_token_response(response).await
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String, AccessTokenError> {
        cached_or_refresh(&self.cache, "service_account", || self.fetch_token()).await
    }
}
