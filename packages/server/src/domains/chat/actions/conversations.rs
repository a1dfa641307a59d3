use serde::Deserialize;
use tracing::info;

use crate::common::{ConversationId, Requester, UserId};
use crate::domains::auth::User;
use crate::domains::chat::access::authorize_conversation;
use crate::domains::chat::error::{ChatError, ChatResult};
use crate::domains::chat::events::ChatEvent;
use crate::domains::chat::models::{
    Conversation, ConversationFilter, ConversationSummary, UnreadScope,
    DEFAULT_CONVERSATION_TITLE,
};
use crate::kernel::ServerDeps;

/// Input for starting a conversation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConversation {
    pub title: Option<String>,
    /// Owner to attribute the conversation to. Admin only.
    pub target_user_id: Option<UserId>,
}

/// Conversations visible to the requester.
///
/// Customers always get their own conversations; `filter` only applies to
/// admins.
pub async fn list_conversations(
    requester: &Requester,
    filter: ConversationFilter,
    deps: &ServerDeps,
) -> ChatResult<Vec<ConversationSummary>> {
    let scope = UnreadScope::new(*requester);
    let mut summaries = ConversationSummary::list(&scope, &deps.db_pool).await?;

    if requester.is_admin {
        summaries.retain(|s| filter.matches(s));
    }

    Ok(summaries)
}

pub async fn create_conversation(
    requester: &Requester,
    input: CreateConversation,
    deps: &ServerDeps,
) -> ChatResult<Conversation> {
    let title = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_TITLE);

    let owner_id = match input.target_user_id {
        Some(target) if requester.is_admin => {
            User::find_by_id(target, &deps.db_pool)
                .await?
                .ok_or(ChatError::NotFound("User"))?;
            target
        }
        _ => requester.user_id,
    };

    info!(
        requested_by = %requester.user_id,
        %owner_id,
        title,
        "Creating conversation"
    );

    let conversation = Conversation::create(owner_id, title, &deps.db_pool).await?;
    Ok(conversation)
}

pub async fn rename_conversation(
    requester: &Requester,
    conversation_id: ConversationId,
    title: &str,
    deps: &ServerDeps,
) -> ChatResult<Conversation> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ChatError::validation("Title cannot be empty"));
    }

    let conversation = authorize_conversation(requester, conversation_id, &deps.db_pool).await?;
    if conversation.title == title {
        return Err(ChatError::validation("Title is unchanged"));
    }

    info!(%conversation_id, title, "Renaming conversation");
    let conversation = Conversation::rename(conversation_id, title, &deps.db_pool).await?;
    Ok(conversation)
}

/// Delete a conversation and, through the cascade, all of its messages.
pub async fn delete_conversation(
    requester: &Requester,
    conversation_id: ConversationId,
    deps: &ServerDeps,
) -> ChatResult<()> {
    let conversation = authorize_conversation(requester, conversation_id, &deps.db_pool).await?;

    let removed = Conversation::delete(conversation_id, &deps.db_pool).await?;
    info!(%conversation_id, removed_messages = removed.len(), "Deleted conversation");

    for message_id in removed {
        ChatEvent::MessageDeleted {
            message_id,
            conversation_id,
        }
        .publish(conversation.user_id, &deps.stream_hub)
        .await;
    }

    Ok(())
}
