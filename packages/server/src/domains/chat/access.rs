//! Conversation access control.
//!
//! A customer may only touch conversations they own; an admin may touch any
//! conversation without owning it. Existence is checked before ownership, so
//! a missing conversation is always `NotFound`, never `Forbidden`.

use sqlx::PgPool;

use crate::common::{ConversationId, Requester};
use crate::domains::chat::error::{ChatError, ChatResult};
use crate::domains::chat::models::{Conversation, Message};

/// Ownership rule, no I/O.
pub fn check_conversation_access(
    requester: &Requester,
    conversation: &Conversation,
) -> ChatResult<()> {
    if requester.is_admin || conversation.user_id == requester.user_id {
        Ok(())
    } else {
        Err(ChatError::Forbidden)
    }
}

/// Rules for removing a single message.
///
/// Admins may delete anything. Everyone else may delete only messages they
/// sent themselves, and only while they are still unread.
pub fn check_message_deletion(requester: &Requester, message: &Message) -> ChatResult<()> {
    if requester.is_admin {
        return Ok(());
    }
    if message.sender_id != requester.user_id {
        return Err(ChatError::Forbidden);
    }
    if message.is_read {
        return Err(ChatError::validation("Cannot delete read message"));
    }
    Ok(())
}

/// Load a conversation and authorize the requester against it.
pub async fn authorize_conversation(
    requester: &Requester,
    conversation_id: ConversationId,
    pool: &PgPool,
) -> ChatResult<Conversation> {
    let conversation = Conversation::find_by_id(conversation_id, pool)
        .await?
        .ok_or(ChatError::NotFound("Conversation"))?;

    check_conversation_access(requester, &conversation)?;
    Ok(conversation)
}
