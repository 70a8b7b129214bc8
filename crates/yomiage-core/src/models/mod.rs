//! Request and result payloads of the two callable operations
//!
//! Payloads arrive as the untyped `data` member of the callable envelope and are
//! converted here, so shape errors surface as invalid-argument before any outbound call.

mod ocr;
mod speech;

pub use ocr::{OcrRequest, OcrResult};
pub use speech::{SpeechRequest, SpeechResult, TEXT_REQUIRED_MESSAGE};
