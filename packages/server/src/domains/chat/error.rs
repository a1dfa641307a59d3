//! Error taxonomy of the chat domain.

use thiserror::Error;

use crate::common::AuthError;

/// Postgres SQLSTATE codes raised while migrations have not created the
/// chat tables yet (undefined_table, invalid_schema_name).
const SCHEMA_NOT_READY_CODES: [&str; 2] = ["42P01", "3F000"];

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Chat storage is starting up, try again shortly")]
    SchemaNotReady,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db
                .code()
                .is_some_and(|code| SCHEMA_NOT_READY_CODES.contains(&code.as_ref()))
            {
                return Self::SchemaNotReady;
            }
        }
        Self::Database(err)
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        // Model queries return anyhow; recover the sqlx error to classify it
        match err.downcast::<sqlx::Error>() {
            Ok(db) => db.into(),
            Err(other) => Self::Internal(other),
        }
    }
}

impl From<AuthError> for ChatError {
    fn from(_: AuthError) -> Self {
        Self::Unauthorized
    }
}
