//! REST endpoints of the support chat, mounted under `/api/chat`.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::{ConversationId, MessageId, OffsetPagination};
use crate::domains::chat::actions::{self, CreateConversation, MessagePage};
use crate::domains::chat::{ChatError, ChatResult, Conversation, ConversationFilter, ConversationSummary, Message};
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    pub filter: Option<ConversationFilter>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameConversationBody {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// GET /api/chat/conversations
pub async fn list_conversations_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    query: Result<Query<ListConversationsQuery>, QueryRejection>,
) -> ChatResult<Json<Vec<ConversationSummary>>> {
    let Query(query) = query?;
    let summaries = actions::list_conversations(
        &user.requester(),
        query.filter.unwrap_or_default(),
        &state.server_deps,
    )
    .await?;
    Ok(Json(summaries))
}

/// POST /api/chat/conversations
///
/// The body is optional; an empty body creates a default-titled conversation.
pub async fn create_conversation_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    body: Bytes,
) -> ChatResult<(StatusCode, Json<Conversation>)> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        CreateConversation::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ChatError::validation(format!("Invalid request body: {}", e)))?
    };
    let conversation =
        actions::create_conversation(&user.requester(), input, &state.server_deps).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// PUT /api/chat/conversations/:id
pub async fn rename_conversation_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    conversation_id: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<RenameConversationBody>, JsonRejection>,
) -> ChatResult<Json<Conversation>> {
    let Path(conversation_id) = conversation_id?;
    let Json(body) = body?;
    let conversation = actions::rename_conversation(
        &user.requester(),
        conversation_id,
        &body.title,
        &state.server_deps,
    )
    .await?;
    Ok(Json(conversation))
}

/// DELETE /api/chat/conversations/:id
pub async fn delete_conversation_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    conversation_id: Result<Path<ConversationId>, PathRejection>,
) -> ChatResult<StatusCode> {
    let Path(conversation_id) = conversation_id?;
    actions::delete_conversation(&user.requester(), conversation_id, &state.server_deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/chat/conversations/:id/messages?limit=&offset=
pub async fn list_messages_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    conversation_id: Result<Path<ConversationId>, PathRejection>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> ChatResult<Json<MessagePage>> {
    let Path(conversation_id) = conversation_id?;
    let Query(query) = query?;
    let page = OffsetPagination::from_query(query.limit, query.offset);
    let page =
        actions::list_messages(&user.requester(), conversation_id, page, &state.server_deps)
            .await?;
    Ok(Json(page))
}

/// POST /api/chat/conversations/:id/messages
pub async fn send_message_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    conversation_id: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> ChatResult<(StatusCode, Json<Message>)> {
    let Path(conversation_id) = conversation_id?;
    let Json(body) = body?;
    let message = actions::send_message(
        &user.requester(),
        conversation_id,
        &body.content,
        &state.server_deps,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// DELETE /api/chat/messages/:id
pub async fn delete_message_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    message_id: Result<Path<MessageId>, PathRejection>,
) -> ChatResult<StatusCode> {
    let Path(message_id) = message_id?;
    actions::delete_message(&user.requester(), message_id, &state.server_deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/chat/unread-count
pub async fn unread_count_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ChatResult<Json<UnreadCountResponse>> {
    let count = actions::unread_count(&user.requester(), &state.server_deps).await?;
    Ok(Json(UnreadCountResponse { count }))
}
