//! Dependency container handed to every chat action.

use sqlx::PgPool;
use std::sync::Arc;

use crate::domains::auth::JwtService;
use crate::kernel::stream_hub::StreamHub;

/// Shared handles used by domain actions and HTTP handlers.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub stream_hub: StreamHub,
    pub jwt_service: Arc<JwtService>,
}

impl ServerDeps {
    pub fn new(db_pool: PgPool, stream_hub: StreamHub, jwt_service: Arc<JwtService>) -> Self {
        Self {
            db_pool,
            stream_hub,
            jwt_service,
        }
    }
}
