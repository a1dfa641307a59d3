use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ConversationId, MessageId, UserId};

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "Nova Conversa";

/// Conversation - a support thread owned by exactly one customer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Conversation Queries
// =============================================================================

impl Conversation {
    /// Find conversation by ID
    pub async fn find_by_id(id: ConversationId, pool: &PgPool) -> Result<Option<Self>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(conversation)
    }

    /// Create a new conversation
    pub async fn create(user_id: UserId, title: &str, pool: &PgPool) -> Result<Self> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, user_id, title, updated_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(ConversationId::new())
        .bind(user_id)
        .bind(title)
        .fetch_one(pool)
        .await?;
        Ok(conversation)
    }

    /// Rename a conversation
    pub async fn rename(id: ConversationId, title: &str, pool: &PgPool) -> Result<Self> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            UPDATE conversations
            SET title = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_one(pool)
        .await?;
        Ok(conversation)
    }

    /// Bump updated_at after a message insert
    pub async fn touch(id: ConversationId, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a conversation; messages go with it (ON DELETE CASCADE).
    ///
    /// Returns the ids of the messages that were removed.
    pub async fn delete(id: ConversationId, pool: &PgPool) -> Result<Vec<MessageId>> {
        let message_ids = sqlx::query_scalar::<_, MessageId>(
            "SELECT id FROM messages WHERE conversation_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(message_ids)
    }
}
