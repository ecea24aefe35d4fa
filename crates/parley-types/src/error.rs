//! Error hierarchy for Parley.

use thiserror::Error;

/// Top-level error type for conversation operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Context compression failed: {0}")]
    Compression(#[source] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ParleyError {
    /// The completion-client error behind this failure, if there is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ParleyError::Api(e) | ParleyError::Compression(e) => Some(e),
            ParleyError::Config(_) => None,
        }
    }
}

/// Errors from the Anthropic Messages API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, I/O, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Remote error: {status} {message}")]
    Remote {
        status: u16,
        message: String,
        body: String,
        retry_after_ms: Option<u64>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response contained no content")]
    EmptyResponse,
}

impl ApiError {
    /// HTTP status of a remote error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_error_exposes_inner_api_error() {
        let err = ParleyError::Compression(ApiError::EmptyResponse);
        assert!(matches!(err.api_error(), Some(ApiError::EmptyResponse)));
        assert!(err.to_string().starts_with("Context compression failed"));
    }

    #[test]
    fn remote_status() {
        let err = ApiError::Remote {
            status: 529,
            message: "Overloaded".into(),
            body: String::new(),
            retry_after_ms: None,
        };
        assert_eq!(err.status(), Some(529));
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
    }

    #[test]
    fn config_error_has_no_api_error() {
        let err = ParleyError::from(ConfigError::MissingKey {
            key: "api_key".into(),
        });
        assert!(err.api_error().is_none());
    }
}
