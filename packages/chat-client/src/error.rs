//! Error types for the chat client.

use thiserror::Error;

/// Result type for chat client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Chat client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network error (connection failed, timeout, stream dropped)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; `message` is the server's `error` field when present
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),

    /// An operation needed an open conversation and none is open
    #[error("No conversation is open")]
    NoActiveConversation,
}

impl ClientError {
    /// Network failures and a server still starting up may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Api { status: 503, .. } | ClientError::Network(_))
    }
}
