//! Error types for docqa.
//!
//! A single error enum covers every failure class the service can report.
//! The HTTP layer maps each variant onto a status code through [`AppError::code`].

use thiserror::Error;

/// Unified error type for docqa.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The identifier has no corresponding index or table
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing required field, malformed body, or unsupported file type
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Embedding or generation model unreachable or failing
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Index or table write/read failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable machine-readable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Storage(_) | AppError::Io(_) => "storage_error",
            AppError::Config(_) => "config_error",
            AppError::Prompt(_) => "prompt_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Other(_) => "internal_error",
        }
    }

    /// Message without the category prefix added by `Display`.
    pub fn detail(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ServiceUnavailable(msg)
            | AppError::Storage(msg)
            | AppError::Config(msg)
            | AppError::Prompt(msg)
            | AppError::Serialization(msg)
            | AppError::Other(msg) => msg.clone(),
            AppError::Io(err) => err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
