use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;

use crate::dispatch::DispatchError;

/// Custom error type for render_discord_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error("No destination channel is configured")]
    DestinationNotConfigured,

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl RelayError {
    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidSignature => StatusCode::UNAUTHORIZED,
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short plain-text body sent back to the caller. Never carries
    /// configuration values or the reason a signature was rejected.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::SecretNotConfigured => "Server not configured".to_string(),
            RelayError::DestinationNotConfigured => "Discord channel not configured".to_string(),
            RelayError::InvalidSignature => "Invalid signature".to_string(),
            RelayError::InvalidRequest(msg) => msg.clone(),
            RelayError::Dispatch(DispatchError::DestinationUnavailable(_)) => {
                "Discord channel not available".to_string()
            }
            RelayError::Dispatch(DispatchError::SendFailed(_)) => {
                "Failed to post to Discord".to_string()
            }
            _ => "Server error".to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
