//! Error types module
//!
//! All failures that reach a caller are unified under [`AppError`]. Each variant maps to
//! exactly one [`PublicErrorKind`], the closed set of error kinds the callable protocol
//! exposes. Internal detail (upstream error chains) never leaves the process; it is only
//! written to server-side logs.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected credentials and exceeded deadlines
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Public error kinds of the callable protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorKind {
    InvalidArgument,
    Unauthenticated,
    DeadlineExceeded,
    Internal,
}

impl PublicErrorKind {
    /// Canonical status string used in the `error.status` field.
    pub fn status(&self) -> &'static str {
        match self {
            PublicErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            PublicErrorKind::Unauthenticated => "UNAUTHENTICATED",
            PublicErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            PublicErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PublicErrorKind::InvalidArgument => 400,
            PublicErrorKind::Unauthenticated => 401,
            PublicErrorKind::DeadlineExceeded => 504,
            PublicErrorKind::Internal => 500,
        }
    }
}

impl Display for PublicErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PublicErrorKind::InvalidArgument => write!(f, "invalid-argument"),
            PublicErrorKind::Unauthenticated => write!(f, "unauthenticated"),
            PublicErrorKind::DeadlineExceeded => write!(f, "deadline-exceeded"),
            PublicErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// Public error kind this error is flattened to
    fn public_kind(&self) -> PublicErrorKind;

    /// HTTP status code to return
    fn http_status_code(&self) -> u16 {
        self.public_kind().http_status_code()
    }

    /// Machine-readable error code (e.g., "INVALID_ARGUMENT")
    fn error_code(&self) -> &'static str {
        self.public_kind().status()
    }

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Generic message for internal failures that carry no operation-specific wording.
pub const GENERIC_INTERNAL_MESSAGE: &str = "INTERNAL";

/// Generic message for rejected credentials.
pub const GENERIC_UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated";

/// Generic message for calls that ran out of time.
pub const GENERIC_DEADLINE_EXCEEDED_MESSAGE: &str = "DEADLINE_EXCEEDED";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The operation ran past its wall-clock budget
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Internal failure with an operation-specific public message and a hidden cause
    #[error("Internal error: {public_message}")]
    InternalWithSource {
        public_message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            public_message: GENERIC_INTERNAL_MESSAGE.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidArgument(format!("Invalid request body: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidArgument(format!("Validation error: {}", err))
    }
}

impl AppError {
    /// Internal failure that shows `public_message` to the caller and keeps `source` in logs.
    pub fn internal_with(public_message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::InternalWithSource {
            public_message: public_message.into(),
            source: source.into(),
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::DeadlineExceeded(_) => "DeadlineExceeded",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn public_kind(&self) -> PublicErrorKind {
        match self {
            AppError::InvalidArgument(_) => PublicErrorKind::InvalidArgument,
            AppError::Unauthenticated(_) => PublicErrorKind::Unauthenticated,
            AppError::DeadlineExceeded(_) => PublicErrorKind::DeadlineExceeded,
            AppError::InternalWithSource { .. } => PublicErrorKind::Internal,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidArgument(ref msg) => msg.clone(),
            AppError::Unauthenticated(_) => GENERIC_UNAUTHENTICATED_MESSAGE.to_string(),
            AppError::DeadlineExceeded(_) => GENERIC_DEADLINE_EXCEEDED_MESSAGE.to_string(),
            AppError::InternalWithSource {
                ref public_message, ..
            } => public_message.clone(),
        }
    }

    fn is_sensitive(&self) -> bool {
        matches!(self, AppError::InternalWithSource { .. })
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidArgument(_) => LogLevel::Debug,
            AppError::Unauthenticated(_) => LogLevel::Warn,
            AppError::DeadlineExceeded(_) => LogLevel::Warn,
            AppError::InternalWithSource { .. } => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_invalid_argument() {
        let err = AppError::InvalidArgument("imageUrl is required".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert_eq!(err.client_message(), "imageUrl is required");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_unauthenticated_hides_reason() {
        let err = AppError::Unauthenticated("Token has expired".to_string());
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
        assert_eq!(err.client_message(), "Unauthenticated");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_internal_with_source_keeps_cause_out_of_client_message() {
        let err = AppError::internal_with(
            "音声変換処理に失敗しました",
            anyhow::anyhow!("bucket write denied"),
        );
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "INTERNAL");
        assert_eq!(err.client_message(), "音声変換処理に失敗しました");
        assert!(err.is_sensitive());
        assert!(err.detailed_message().contains("bucket write denied"));
    }

    #[test]
    fn test_anyhow_conversion_is_generic_internal() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(err.public_kind(), PublicErrorKind::Internal);
        assert_eq!(err.client_message(), GENERIC_INTERNAL_MESSAGE);
    }

    #[test]
    fn test_public_kind_display() {
        assert_eq!(PublicErrorKind::InvalidArgument.to_string(), "invalid-argument");
        assert_eq!(PublicErrorKind::Unauthenticated.to_string(), "unauthenticated");
        assert_eq!(PublicErrorKind::Internal.to_string(), "internal");
        assert_eq!(PublicErrorKind::DeadlineExceeded.to_string(), "deadline-exceeded");
    }

    #[test]
    fn test_deadline_exceeded_metadata() {
        let err = AppError::DeadlineExceeded("textToSpeechFunction exceeded 300s".to_string());
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.error_code(), "DEADLINE_EXCEEDED");
        assert_eq!(err.client_message(), GENERIC_DEADLINE_EXCEEDED_MESSAGE);
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }
}
