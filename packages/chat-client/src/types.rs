//! Wire records exchanged with the chat API.
//!
//! Shapes are validated once here, at the API boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type ConversationId = Uuid;
pub type MessageId = Uuid;

/// Conversation as returned by create and rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub user_id: UserId,
    pub user_email: String,
    pub title: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_sender_id: Option<UserId>,
    #[serde(default)]
    pub last_sender_is_admin: bool,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One page, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Admin-side narrowing of the conversation list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationFilter {
    #[default]
    All,
    Unread,
    Unanswered,
}

impl ConversationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationFilter::All => "all",
            ConversationFilter::Unread => "unread",
            ConversationFilter::Unanswered => "unanswered",
        }
    }
}

/// Change feed payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    MessageInserted {
        message: Message,
    },
    MessageDeleted {
        message_id: MessageId,
        conversation_id: ConversationId,
    },
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
        count: u64,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateConversationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenameConversationBody<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageBody<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_server_json() {
        let conversation_id = Uuid::now_v7();
        let raw = serde_json::json!({
            "type": "messages_read",
            "conversation_id": conversation_id,
            "reader_id": Uuid::now_v7(),
            "count": 3
        });

        match serde_json::from_value::<ChatEvent>(raw).unwrap() {
            ChatEvent::MessagesRead { conversation_id: id, count, .. } => {
                assert_eq!(id, conversation_id);
                assert_eq!(count, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let raw = serde_json::json!({ "type": "message_updated" });
        assert!(serde_json::from_value::<ChatEvent>(raw).is_err());
    }
}
