// src/error.rs
// Standardized error types for kit-mcp

use thiserror::Error;

/// Main error type for the kit-mcp library
#[derive(Error, Debug)]
pub enum KitError {
    #[error("operation '{0}' is forbidden by policy")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Kit API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using KitError
pub type Result<T> = std::result::Result<T, KitError>;

impl From<KitError> for String {
    fn from(err: KitError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_error() {
        let err = KitError::Forbidden("delete_broadcast".to_string());
        assert!(err.to_string().contains("forbidden"));
        assert!(err.to_string().contains("delete_broadcast"));
    }

    #[test]
    fn test_not_found_error() {
        let err = KitError::NotFound("draft \"draft_1_abc\"".to_string());
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("draft_1_abc"));
    }

    #[test]
    fn test_invalid_input_error() {
        let err = KitError::InvalidInput("missing subject".to_string());
        assert!(err.to_string().contains("invalid input"));
        assert!(err.to_string().contains("missing subject"));
    }

    #[test]
    fn test_config_error() {
        let err = KitError::Config("KIT_API_KEY is required".to_string());
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("KIT_API_KEY"));
    }

    #[test]
    fn test_api_error_carries_status() {
        let err = KitError::Api {
            status: 422,
            message: "Unprocessable".to_string(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("Unprocessable"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KitError = io_err.into();
        assert!(matches!(err, KitError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err: KitError = json_err.into();
        assert!(matches!(err, KitError::Json(_)));
    }

    #[test]
    fn test_into_string() {
        let err = KitError::NotFound("approval 'approval_9'".to_string());
        let s: String = err.into();
        assert!(s.contains("not found"));
    }
}
