//! Chat domain - support conversations between a customer and the admin side.
//!
//! Layout:
//! - `models`: SQL for conversations, messages, summaries and unread scope
//! - `access`: ownership and deletion rules
//! - `actions`: the operations exposed over HTTP
//! - `events`: change feed payloads pushed through the stream hub

pub mod access;
pub mod actions;
pub mod error;
pub mod events;
pub mod models;

pub use error::{ChatError, ChatResult};
pub use events::ChatEvent;
pub use models::*;
