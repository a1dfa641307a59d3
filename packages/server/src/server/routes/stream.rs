//! SSE change feed.
//!
//! GET /api/chat/stream?token=JWT
//!
//! EventSource can't send custom headers, so the JWT may be passed as the
//! `?token=` query param; the Authorization header is accepted as well.
//! Admins receive every chat change, customers only those of their own
//! conversations.

use std::convert::Infallible;

use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::common::Requester;
use crate::domains::chat::ChatError;
use crate::kernel::{user_topic, ADMINS_TOPIC};
use crate::server::app::AxumAppState;

#[derive(Deserialize)]
pub struct StreamQuery {
    /// JWT token for authentication
    token: Option<String>,
}

/// Topic a requester's connection listens on.
pub fn topic_for(requester: &Requester) -> String {
    if requester.is_admin {
        ADMINS_TOPIC.to_string()
    } else {
        user_topic(requester.user_id)
    }
}

/// SSE stream handler.
///
/// Emits `connected` first, then one event per chat change named after its
/// `type` field. A receiver that fell behind gets `lagged` with the number
/// of dropped events and should refetch.
pub async fn stream_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, ChatError> {
    let token = query
        .token
        .or_else(|| extract_bearer_token(&headers))
        .ok_or(ChatError::Unauthorized)?;

    let claims = state.jwt_service.verify_token(&token)?;
    let topic = topic_for(&claims.requester());
    debug!(user_id = %claims.user_id, topic, "Opening chat stream");

    let rx = state.stream_hub.subscribe(&topic).await;

    // Stream with connected event and lag handling
    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let events = BroadcastStream::new(rx).filter_map(|result| async {
        match result {
            Ok(value) => {
                let event_name = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("message");
                Event::default()
                    .event(event_name)
                    .json_data(&value)
                    .ok()
                    .map(Ok)
            }
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                Event::default()
                    .event("lagged")
                    .json_data(serde_json::json!({"missed": n}))
                    .ok()
                    .map(Ok)
            }
        }
    });

    Ok(Sse::new(connected.chain(events)).keep_alive(KeepAlive::default()))
}

/// Extract Bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.to_string())
}
