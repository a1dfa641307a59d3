//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{delete, get, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::auth::JwtService;
use crate::kernel::{ServerDeps, StreamHub};
use crate::server::middleware::{apply_rate_limit, jwt_auth_middleware, RateLimitSettings};
use crate::server::routes::{
    create_conversation_handler, delete_conversation_handler, delete_message_handler,
    health_handler, list_conversations_handler, list_messages_handler,
    rename_conversation_handler, send_message_handler, stream_handler, unread_count_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub db_pool: PgPool,
    pub server_deps: Arc<ServerDeps>,
    pub stream_hub: StreamHub,
    pub jwt_service: Arc<JwtService>,
}

/// Everything `build_app` needs besides the pool
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Empty means any origin is accepted
    pub allowed_origins: Vec<String>,
    /// `None` disables rate limiting (tests drive the router without a socket)
    pub rate_limit: Option<RateLimitSettings>,
}

/// Build the Axum application router
///
/// Returns the router and the shared deps; main keeps the deps for the
/// stream hub cleanup task.
pub fn build_app(pool: PgPool, options: AppOptions) -> Result<(Router, Arc<ServerDeps>)> {
    let jwt_service = Arc::new(JwtService::new(&options.jwt_secret, options.jwt_issuer));
    let stream_hub = StreamHub::new();

    let server_deps = Arc::new(ServerDeps::new(
        pool.clone(),
        stream_hub.clone(),
        jwt_service.clone(),
    ));

    let app_state = AxumAppState {
        db_pool: pool,
        server_deps: server_deps.clone(),
        stream_hub,
        jwt_service: jwt_service.clone(),
    };

    let cors = build_cors(&options.allowed_origins)?;

    let chat = Router::new()
        .route(
            "/conversations",
            get(list_conversations_handler).post(create_conversation_handler),
        )
        .route(
            "/conversations/:id",
            put(rename_conversation_handler).delete(delete_conversation_handler),
        )
        .route(
            "/conversations/:id/messages",
            get(list_messages_handler).post(send_message_handler),
        )
        .route("/messages/:id", delete(delete_message_handler))
        .route("/unread-count", get(unread_count_handler))
        .route("/stream", get(stream_handler));

    let chat = match options.rate_limit {
        Some(settings) => apply_rate_limit(chat, settings)?,
        None => chat,
    };

    let app = Router::new()
        .nest("/api/chat", chat)
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok((app, server_deps))
}

fn build_cors(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid origin: {}", o)))
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}
