//! Which messages count as "unread" for a requester.
//!
//! The total unread counter and the per-conversation counters in the
//! conversation list are both built from the fragments below, so the two
//! numbers can never disagree.
//!
//! - Customer: unread messages in their own conversations sent by someone else.
//! - Admin: unread messages anywhere sent by a non-admin. Replies from other
//!   admins are never counted.
//!
//! Every fragment refers to the requester as `$1` and expects the aliases
//! `c` (conversations) and `m` (messages).

use anyhow::Result;
use sqlx::PgPool;

use crate::common::Requester;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadScope {
    requester: Requester,
}

impl UnreadScope {
    pub fn new(requester: Requester) -> Self {
        Self { requester }
    }

    pub fn requester(&self) -> Requester {
        self.requester
    }

    /// Conversations visible to the requester.
    pub fn conversation_predicate(&self) -> &'static str {
        if self.requester.is_admin {
            "TRUE"
        } else {
            "c.user_id = $1"
        }
    }

    /// Messages that count as unread for the requester.
    pub fn unread_message_predicate(&self) -> &'static str {
        if self.requester.is_admin {
            r#"m.is_read = FALSE
               AND m.sender_id <> $1
               AND NOT EXISTS (
                   SELECT 1 FROM users s
                   WHERE s.id = m.sender_id AND 'admin' = ANY(s.roles)
               )"#
        } else {
            "m.is_read = FALSE AND m.sender_id <> $1"
        }
    }

    /// Total unread count across every conversation in scope.
    pub fn count_sql(&self) -> String {
        format!(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE ({}) AND ({})
            "#,
            self.conversation_predicate(),
            self.unread_message_predicate()
        )
    }

    /// Computes the count; never cached.
    pub async fn count(&self, pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.count_sql())
            .bind(self.requester.user_id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
