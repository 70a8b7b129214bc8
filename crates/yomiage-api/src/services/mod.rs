pub mod ocr;
pub mod speech;

pub use ocr::{OcrError, OcrService};
pub use speech::{Clock, SpeechError, SpeechService, SPEECH_FAILED_MESSAGE};
