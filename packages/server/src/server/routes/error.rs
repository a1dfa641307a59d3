//! HTTP mapping of chat errors.
//!
//! Body is always `{"error": "<message>"}`. Database and internal failures are
//! logged here and answered with a generic message. Extractor rejections
//! (bad path id, query string or JSON body) become `Validation`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::domains::chat::ChatError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Unauthorized => StatusCode::UNAUTHORIZED,
        ChatError::Forbidden => StatusCode::FORBIDDEN,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::SchemaNotReady => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::Database(_) | ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            ChatError::Database(e) => {
                error!(error = %e, "Database error while handling chat request");
                "Internal server error".to_string()
            }
            ChatError::Internal(e) => {
                error!(error = %e, "Internal error while handling chat request");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<QueryRejection> for ChatError {
    fn from(rejection: QueryRejection) -> Self {
        ChatError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ChatError {
    fn from(rejection: PathRejection) -> Self {
        ChatError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        ChatError::Validation(rejection.body_text())
    }
}
