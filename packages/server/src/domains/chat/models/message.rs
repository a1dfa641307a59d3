use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ConversationId, MessageId, OffsetPagination, UserId};

/// Message - one entry in a conversation
///
/// `is_read` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Message Queries
// =============================================================================

impl Message {
    /// Find message by ID
    pub async fn find_by_id(id: MessageId, pool: &PgPool) -> Result<Option<Self>> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(message)
    }

    /// One page of a conversation, newest first.
    ///
    /// Skips the `offset` most recent messages, then takes `limit` older ones.
    /// `id` breaks ties between messages created in the same instant so that
    /// consecutive pages never overlap.
    pub async fn find_page_newest_first(
        conversation_id: ConversationId,
        page: OffsetPagination,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    /// Create a new message
    pub async fn create(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(MessageId::new())
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(pool)
        .await?;
        Ok(message)
    }

    /// Mark every message not sent by `reader_id` as read.
    ///
    /// Idempotent: only rows still unread are touched. Returns the number of
    /// rows that flipped.
    pub async fn mark_read(
        conversation_id: ConversationId,
        reader_id: UserId,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a message
    pub async fn delete(id: MessageId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
