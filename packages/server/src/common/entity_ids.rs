//! Typed ids for every persisted chat entity.
//!
//! ```rust
//! use chat_core::common::{ConversationId, UserId};
//!
//! let owner = UserId::new();
//! let conversation = ConversationId::new();
//! // let wrong: UserId = conversation; // does not compile
//! # let _ = (owner, conversation);
//! ```

pub use super::id::Id;

/// Marker type for users (owned by the auth service).
pub struct User;

/// Marker type for support conversations.
pub struct Conversation;

/// Marker type for chat messages.
pub struct Message;

pub type UserId = Id<User>;

pub type ConversationId = Id<Conversation>;

pub type MessageId = Id<Message>;
