use thiserror::Error;

/// Authentication errors raised before a request reaches the chat domain
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed token subject: {0}")]
    MalformedSubject(#[from] uuid::Error),
}
