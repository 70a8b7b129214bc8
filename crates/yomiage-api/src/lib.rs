//! Yomiage API Library
//!
//! Callable HTTP functions for OCR (`generateOcm`) and read-aloud
//! (`textToSpeechFunction`), plus their setup, middleware and error mapping.

mod api_doc;
mod handlers;
mod middleware;
mod telemetry;

pub mod auth;
pub mod callable;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use setup::routes::setup_routes;
pub use state::AppState;
