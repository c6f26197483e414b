use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message reported by every saver operation that runs before both
/// collaborators are ready.
pub const NOT_INITIALIZED: &str = "Error: not initialized";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{service} error {code}: {message}")]
    Api {
        service: String,
        code: i64,
        message: String,
    },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Rate limit exceeded. Retry after {retry_after_ms}ms")]
    RateLimit { retry_after_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn api(service: &str, code: i64, message: &str) -> Self {
        Self::Api {
            service: service.to_string(),
            code,
            message: message.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::RateLimit { .. } => true,
            AppError::Api { code, .. } => matches!(*code, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Uniform outcome of every collaborator call.
///
/// `object` carries the decoded response body when there is one. A successful
/// result never carries a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T = serde_json::Value> {
    pub object: Option<T>,
    pub success: bool,
    pub message: String,
}

impl<T> OperationResult<T> {
    pub fn ok(object: Option<T>) -> Self {
        Self {
            object,
            success: true,
            message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            object: None,
            success: false,
            message: message.into(),
        }
    }

    /// Failure carrying the response body, e.g. an API error document.
    pub fn failure_with(object: Option<T>, message: impl Into<String>) -> Self {
        Self {
            object,
            success: false,
            message: message.into(),
        }
    }

    pub fn not_initialized() -> Self {
        Self::failure(NOT_INITIALIZED)
    }
}

impl<T> From<AppResult<Option<T>>> for OperationResult<T> {
    fn from(result: AppResult<Option<T>>) -> Self {
        match result {
            Ok(object) => OperationResult::ok(object),
            Err(e) => OperationResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_never_carries_message() {
        let result: OperationResult = OperationResult::ok(None);
        assert!(result.success);
        assert!(result.message.is_empty());
        assert!(result.object.is_none());
    }

    #[test]
    fn test_not_initialized_shape() {
        let result: OperationResult = OperationResult::not_initialized();
        assert!(!result.success);
        assert!(result.object.is_none());
        assert_eq!(result.message, "Error: not initialized");
    }

    #[test]
    fn test_from_app_result() {
        let err: AppResult<Option<String>> = Err(AppError::api("VK", 5, "User authorization failed"));
        let failed: OperationResult<String> = err.into();
        assert!(!failed.success);
        assert_eq!(failed.message, "VK error 5: User authorization failed");

        let ok: AppResult<Option<String>> = Ok(Some("hello".to_string()));
        let ok: OperationResult<String> = ok.into();
        assert!(ok.success);
        assert_eq!(ok.object.as_deref(), Some("hello"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::RateLimit { retry_after_ms: 100 }.is_retryable());
        assert!(AppError::api("Yandex Disk", 503, "unavailable").is_retryable());
        assert!(!AppError::api("Yandex Disk", 404, "not found").is_retryable());
        assert!(!AppError::validation("path", "empty").is_retryable());
    }
}
