//! Support chat client
//!
//! Keeps one user's view of the support chat in sync with the server:
//! the conversation list, the unread counter and the open conversation with
//! offset-based "load more" paging. Pushed changes from the SSE feed are
//! merged into the same state as fetched pages and confirmed sends, with
//! duplicates dropped by message id.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_client::{ChatSession, HttpChatApi, DEFAULT_PAGE_LIMIT};
//!
//! let api = HttpChatApi::new("http://localhost:8080/api/chat", token);
//! let (session, mut notices) = ChatSession::new(api, DEFAULT_PAGE_LIMIT);
//!
//! session.sign_in(user_id).await;
//! session.open_conversation(conversation_id).await?;
//!
//! // Reached the top of the list
//! let anchor = ScrollAnchor::capture(scroll_height, scroll_top);
//! if session.load_more().await? {
//!     scroll_top = anchor.restore(new_scroll_height);
//! }
//!
//! session.send_message("Olá!").await?;
//! ```

pub mod api;
pub mod error;
pub mod feed;
pub mod scroll;
pub mod session;
pub mod state;
pub mod types;

pub use api::{ChatApi, HttpChatApi};
pub use error::{ClientError, Result};
pub use feed::{ChatFeed, FeedEvent, FeedStream};
pub use scroll::{at_top, ScrollAnchor};
pub use session::ChatSession;
pub use state::{Action, ChatState, Followup, Notice, PageKind, PageRequest, DEFAULT_PAGE_LIMIT};
pub use types::*;
