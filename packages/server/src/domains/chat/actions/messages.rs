use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::{ConversationId, MessageId, OffsetPagination, Requester};
use crate::domains::chat::access::{authorize_conversation, check_message_deletion};
use crate::domains::chat::actions::read_state::mark_read;
use crate::domains::chat::error::{ChatError, ChatResult};
use crate::domains::chat::events::ChatEvent;
use crate::domains::chat::models::{Conversation, Message};
use crate::kernel::ServerDeps;

/// A page of messages in display order (oldest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// False once a page came back shorter than `limit`
    pub has_more: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Fetch a page of a conversation.
///
/// The initial page (`offset == 0`) marks the conversation as read for the
/// requester after the rows were selected; load-more pages never do.
pub async fn list_messages(
    requester: &Requester,
    conversation_id: ConversationId,
    page: OffsetPagination,
    deps: &ServerDeps,
) -> ChatResult<MessagePage> {
    let conversation = authorize_conversation(requester, conversation_id, &deps.db_pool).await?;

    let mut messages =
        Message::find_page_newest_first(conversation_id, page, &deps.db_pool).await?;
    let has_more = page.has_more(messages.len());

    if page.is_initial() {
        mark_read(&conversation, requester.user_id, deps).await?;
    }

    messages.reverse();

    Ok(MessagePage {
        messages,
        has_more,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Append a message and touch the conversation.
///
/// Insert and touch are separate statements; if the touch fails the message
/// stands and `updated_at` stays stale.
pub async fn send_message(
    requester: &Requester,
    conversation_id: ConversationId,
    content: &str,
    deps: &ServerDeps,
) -> ChatResult<Message> {
    if content.trim().is_empty() {
        return Err(ChatError::validation("Message content is required"));
    }

    let conversation = authorize_conversation(requester, conversation_id, &deps.db_pool).await?;

    let message =
        Message::create(conversation_id, requester.user_id, content, &deps.db_pool).await?;

    if let Err(e) = Conversation::touch(conversation_id, &deps.db_pool).await {
        warn!(%conversation_id, error = %e, "Failed to touch conversation after insert");
    }

    info!(%conversation_id, message_id = %message.id, sender_id = %requester.user_id, "Message sent");

    ChatEvent::MessageInserted {
        message: message.clone(),
    }
    .publish(conversation.user_id, &deps.stream_hub)
    .await;

    Ok(message)
}

/// Delete one message, subject to the sender/unread rules.
pub async fn delete_message(
    requester: &Requester,
    message_id: MessageId,
    deps: &ServerDeps,
) -> ChatResult<()> {
    let message = Message::find_by_id(message_id, &deps.db_pool)
        .await?
        .ok_or(ChatError::NotFound("Message"))?;

    let conversation =
        authorize_conversation(requester, message.conversation_id, &deps.db_pool).await?;
    check_message_deletion(requester, &message)?;

    Message::delete(message_id, &deps.db_pool).await?;
    info!(%message_id, conversation_id = %conversation.id, "Message deleted");

    ChatEvent::MessageDeleted {
        message_id,
        conversation_id: conversation.id,
    }
    .publish(conversation.user_id, &deps.stream_hub)
    .await;

    Ok(())
}
