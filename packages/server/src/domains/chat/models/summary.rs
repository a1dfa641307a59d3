use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ConversationId, UserId};
use crate::domains::chat::models::UnreadScope;

/// Row of the conversation list
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub user_id: UserId,
    pub user_email: String,
    pub title: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_sender_id: Option<UserId>,
    pub last_sender_is_admin: bool,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-side narrowing of the conversation list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationFilter {
    #[default]
    All,
    /// At least one message counts as unread for the requester
    Unread,
    /// The last message came from a customer and awaits a reply
    Unanswered,
}

impl ConversationFilter {
    pub fn matches(&self, summary: &ConversationSummary) -> bool {
        match self {
            ConversationFilter::All => true,
            ConversationFilter::Unread => summary.unread_count > 0,
            ConversationFilter::Unanswered => {
                summary.last_sender_id.is_some() && !summary.last_sender_is_admin
            }
        }
    }
}

impl std::fmt::Display for ConversationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationFilter::All => write!(f, "all"),
            ConversationFilter::Unread => write!(f, "unread"),
            ConversationFilter::Unanswered => write!(f, "unanswered"),
        }
    }
}

impl std::str::FromStr for ConversationFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(ConversationFilter::All),
            "unread" => Ok(ConversationFilter::Unread),
            "unanswered" => Ok(ConversationFilter::Unanswered),
            _ => Err(anyhow::anyhow!("Invalid conversation filter: {}", s)),
        }
    }
}

// =============================================================================
// Summary Queries
// =============================================================================

impl ConversationSummary {
    /// List conversations visible in `scope` with their last message and
    /// unread counter, most recent activity first.
    pub async fn list(scope: &UnreadScope, pool: &PgPool) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT
                c.id,
                c.user_id,
                u.email AS user_email,
                c.title,
                last.content AS last_message,
                last.created_at AS last_message_at,
                last.sender_id AS last_sender_id,
                COALESCE(last_sender.is_admin, FALSE) AS last_sender_is_admin,
                (
                    SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id AND ({unread})
                ) AS unread_count,
                c.created_at,
                c.updated_at
            FROM conversations c
            JOIN users u ON u.id = c.user_id
            LEFT JOIN LATERAL (
                SELECT content, created_at, sender_id
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) last ON TRUE
            LEFT JOIN LATERAL (
                SELECT 'admin' = ANY(roles) AS is_admin
                FROM users
                WHERE id = last.sender_id
            ) last_sender ON TRUE
            WHERE {conversations}
            ORDER BY last.created_at DESC NULLS LAST, c.updated_at DESC
            "#,
            unread = scope.unread_message_predicate(),
            conversations = scope.conversation_predicate(),
        );

        let summaries = sqlx::query_as::<_, ConversationSummary>(&sql)
            .bind(scope.requester().user_id)
            .fetch_all(pool)
            .await?;
        Ok(summaries)
    }
}
