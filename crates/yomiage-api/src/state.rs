//! Application state shared by every request.
//!
//! Clients are built once during setup and are immutable afterwards; handlers only
//! ever see them through `Arc<dyn ...>` handles.

use std::sync::Arc;

use yomiage_core::Config;
use yomiage_storage::Storage;

use crate::auth::middleware::AuthState;
use crate::services::{OcrService, SpeechService};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ocr: Arc<OcrService>,
    pub speech: Arc<SpeechService>,
    pub storage: Arc<dyn Storage>,
    pub auth: AuthState,
}
