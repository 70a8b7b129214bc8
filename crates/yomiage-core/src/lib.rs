//! Yomiage Core Library
//!
//! This crate provides the domain models, error types, configuration and the OCR
//! prompt template shared by the storage, services and API crates.

pub mod config;
pub mod error;
pub mod models;
pub mod prompt;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ServiceConfig, VoiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, PublicErrorKind};
pub use prompt::PromptTemplate;
pub use storage_types::StorageBackend;
