//! Change feed events for message rows.
//!
//! Events are published after the write they describe has been committed.
//! Each event goes to the conversation owner's topic and to the admin topic.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{ConversationId, MessageId, UserId};
use crate::domains::chat::models::Message;
use crate::kernel::{user_topic, StreamHub, ADMINS_TOPIC};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message row was inserted
    MessageInserted { message: Message },

    /// A message row was deleted (individually or by conversation cascade)
    MessageDeleted {
        message_id: MessageId,
        conversation_id: ConversationId,
    },

    /// Read-marking flipped `count` messages not sent by `reader_id`
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
        count: u64,
    },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::MessageInserted { .. } => "message_inserted",
            ChatEvent::MessageDeleted { .. } => "message_deleted",
            ChatEvent::MessagesRead { .. } => "messages_read",
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        match self {
            ChatEvent::MessageInserted { message } => message.conversation_id,
            ChatEvent::MessageDeleted {
                conversation_id, ..
            }
            | ChatEvent::MessagesRead {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    /// Topics that must see this event.
    pub fn topics(owner_id: UserId) -> [String; 2] {
        [user_topic(owner_id), ADMINS_TOPIC.to_string()]
    }

    /// Publish to the owner and to every admin.
    pub async fn publish(&self, owner_id: UserId, hub: &StreamHub) {
        let payload = match serde_json::to_value(self) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize chat event");
                return;
            }
        };

        let delivered = hub.publish_many(Self::topics(owner_id), payload).await;
        debug!(
            event = self.event_type(),
            conversation_id = %self.conversation_id(),
            delivered,
            "Published chat event"
        );
    }
}
