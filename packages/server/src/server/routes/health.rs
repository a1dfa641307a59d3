//! Liveness and readiness of the chat API.
//!
//! Ready means the database answers and the chat tables exist. While
//! migrations have not run yet the schema reports `migrating` and the
//! endpoint answers 503, like every chat route does in that window.

use std::time::{Duration, Instant};

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::domains::chat::ChatError;
use crate::kernel::StreamStats;
use crate::server::app::AxumAppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Migrating,
    Error,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: DatabaseHealth,
    chat_schema: CheckStatus,
    connection_pool: ConnectionPoolHealth,
    stream: StreamStats,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

async fn check_database(pool: &PgPool) -> DatabaseHealth {
    let started = Instant::now();
    match tokio::time::timeout(CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(Ok(_)) => DatabaseHealth {
            status: CheckStatus::Ok,
            latency_ms: Some(started.elapsed().as_millis()),
            error: None,
        },
        Ok(Err(e)) => DatabaseHealth {
            status: CheckStatus::Error,
            latency_ms: None,
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => DatabaseHealth {
            status: CheckStatus::Error,
            latency_ms: None,
            error: Some(format!("Query timeout (>{}s)", CHECK_TIMEOUT.as_secs())),
        },
    }
}

/// Touch the messages table; a missing relation means migrations are pending.
async fn check_chat_schema(pool: &PgPool) -> CheckStatus {
    let touch = sqlx::query("SELECT 1 FROM messages LIMIT 1").fetch_optional(pool);
    match tokio::time::timeout(CHECK_TIMEOUT, touch).await {
        Ok(Ok(_)) => CheckStatus::Ok,
        Ok(Err(e)) => match ChatError::from(e) {
            ChatError::SchemaNotReady => CheckStatus::Migrating,
            _ => CheckStatus::Error,
        },
        Err(_) => CheckStatus::Error,
    }
}

/// GET /health
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state.db_pool).await;
    let chat_schema = if database.status == CheckStatus::Ok {
        check_chat_schema(&state.db_pool).await
    } else {
        CheckStatus::Error
    };

    let ready = database.status == CheckStatus::Ok && chat_schema == CheckStatus::Ok;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if ready { "healthy" } else { "unhealthy" },
        database,
        chat_schema,
        connection_pool: ConnectionPoolHealth {
            size: state.db_pool.size(),
            idle_connections: state.db_pool.num_idle(),
            max_connections: state.db_pool.options().get_max_connections(),
        },
        stream: state.stream_hub.stats().await,
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(CheckStatus::Ok).unwrap(), "ok");
        assert_eq!(serde_json::to_value(CheckStatus::Migrating).unwrap(), "migrating");
    }
}
