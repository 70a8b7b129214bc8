//! Yomiage Services Library
//!
//! Clients for the external Google services the callable operations depend on:
//! Gemini generation, Cloud Text-to-Speech, OAuth access tokens (service account key or
//! metadata server), and Firebase ID token / App Check verification.
//!
//! Every client is constructed once at startup and is immutable afterwards, so a
//! single instance is shared by all concurrent requests.

pub mod firebase_auth;
pub mod gemini;
pub mod google_auth;
pub mod text_to_speech;

pub use firebase_auth::{
    AppCheckClaims, AppCheckTokenVerifier, FirebaseAppCheckVerifier, FirebaseIdTokenVerifier,
    IdTokenVerifier, JwksVerifier, TokenError, VerifiedUser,
};
pub use gemini::{GeminiClient, GenerationError, GenerativeModel};
pub use google_auth::{
    AccessTokenError, AccessTokenProvider, GoogleCredentials, MetadataTokenProvider,
    ServiceAccountTokenProvider,
};
pub use text_to_speech::{GoogleTextToSpeech, SpeechSynthesizer, SynthesisError};
