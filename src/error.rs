//! Error types for the financial advisor

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Request Errors
    // =============================

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    /// Transient provider failure, retried before surfacing
    #[error("LLM provider unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdvisorError {
    /// HTTP status reported to API callers for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdvisorError::EmptyQuery
            | AdvisorError::InvalidQuery(_)
            | AdvisorError::UuidError(_) => StatusCode::BAD_REQUEST,
            AdvisorError::NotFound(_) => StatusCode::NOT_FOUND,
            AdvisorError::LlmError(_)
            | AdvisorError::LlmUnavailable(_)
            | AdvisorError::ToolError(_)
            | AdvisorError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AdvisorError::EmptyQuery.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AdvisorError::NotFound("log".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdvisorError::LlmError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AdvisorError::DatabaseError("gone".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
