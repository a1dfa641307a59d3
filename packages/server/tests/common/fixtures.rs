//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use chat_core::common::{ConversationId, UserId};
use chat_core::domains::auth::User;
use chat_core::domains::chat::{Conversation, Message};
use uuid::Uuid;

use super::TestHarness;

/// A seeded user together with a valid bearer token.
pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub token: String,
}

impl TestHarness {
    async fn user_with_roles(&self, prefix: &str, roles: &[&str]) -> TestUser {
        let email = format!("{}-{}@example.com", prefix, Uuid::new_v4());
        let user = User::create(&email, roles, &self.db_pool)
            .await
            .expect("Failed to create user");
        let token = self
            .jwt_service
            .create_token(user.id, user.email.clone(), user.roles.clone())
            .expect("Failed to create token");

        TestUser {
            id: user.id,
            email: user.email,
            token,
        }
    }

    pub async fn customer(&self) -> TestUser {
        self.user_with_roles("customer", &[]).await
    }

    pub async fn admin(&self) -> TestUser {
        self.user_with_roles("admin", &["admin"]).await
    }

    /// Conversation owned by `owner`, created directly in the database.
    pub async fn conversation(&self, owner: &TestUser, title: &str) -> ConversationId {
        Conversation::create(owner.id, title, &self.db_pool)
            .await
            .expect("Failed to create conversation")
            .id
    }

    /// Insert `count` messages numbered `1..=count` in creation order.
    pub async fn seed_messages(
        &self,
        conversation_id: ConversationId,
        sender: &TestUser,
        count: usize,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(count);
        for n in 1..=count {
            let message = Message::create(conversation_id, sender.id, &format!("msg {}", n), &self.db_pool)
                .await
                .expect("Failed to create message");
            messages.push(message);
        }
        messages
    }
}
