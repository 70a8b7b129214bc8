use async_trait::async_trait;
use yomiage_services::{
    AppCheckClaims, AppCheckTokenVerifier, IdTokenVerifier, TokenError, VerifiedUser,
};

/// ID tokens of the form `valid-token-<uid>` verify as `<uid>`
pub const ID_TOKEN_PREFIX: &str = "valid-token-";
pub const VALID_APP_CHECK_TOKEN: &str = "valid-app-check";
pub const TEST_APP_ID: &str = "1:123456:web:abc";

pub fn bearer(uid: &str) -> String {
    format!("Bearer {}{}", ID_TOKEN_PREFIX, uid)
}

pub struct FakeIdTokenVerifier;

#[async_trait]
impl IdTokenVerifier for FakeIdTokenVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedUser, TokenError> {
        match token.strip_prefix(ID_TOKEN_PREFIX) {
            Some(uid) if !uid.is_empty() => Ok(VerifiedUser {
                uid: uid.to_string(),
                email: Some(format!("{}@example.com", uid)),
            }),
            _ => Err(TokenError::Invalid("signature mismatch".to_string())),
        }
    }
}

pub struct FakeAppCheckVerifier;

#[async_trait]
impl AppCheckTokenVerifier for FakeAppCheckVerifier {
    async fn verify_app_check_token(&self, token: &str) -> Result<AppCheckClaims, TokenError> {
        if token == VALID_APP_CHECK_TOKEN {
            Ok(AppCheckClaims {
                sub: TEST_APP_ID.to_string(),
            })
        } else {
            Err(TokenError::Invalid("unknown app".to_string()))
        }
    }
}
