pub mod conversation;
pub mod message;
pub mod summary;
pub mod unread_scope;

pub use conversation::*;
pub use message::*;
pub use summary::*;
pub use unread_scope::*;
