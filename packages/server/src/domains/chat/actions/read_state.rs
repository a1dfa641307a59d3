use tracing::debug;

use crate::common::{Requester, UserId};
use crate::domains::chat::error::ChatResult;
use crate::domains::chat::events::ChatEvent;
use crate::domains::chat::models::{Conversation, Message, UnreadScope};
use crate::kernel::ServerDeps;

/// Mark everything the reader has not sent as read.
///
/// Monotonic and idempotent; an event goes out only when a row changed.
pub async fn mark_read(
    conversation: &Conversation,
    reader_id: UserId,
    deps: &ServerDeps,
) -> ChatResult<u64> {
    let count = Message::mark_read(conversation.id, reader_id, &deps.db_pool).await?;

    if count > 0 {
        debug!(conversation_id = %conversation.id, %reader_id, count, "Marked messages as read");
        ChatEvent::MessagesRead {
            conversation_id: conversation.id,
            reader_id,
            count,
        }
        .publish(conversation.user_id, &deps.stream_hub)
        .await;
    }

    Ok(count)
}

/// Unread messages for the requester, recomputed on every call.
pub async fn unread_count(requester: &Requester, deps: &ServerDeps) -> ChatResult<i64> {
    let count = UnreadScope::new(*requester).count(&deps.db_pool).await?;
    Ok(count)
}
