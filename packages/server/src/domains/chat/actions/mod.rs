//! Chat actions - business logic invoked by the HTTP routes.
//!
//! Every action authorizes first and writes second; events are published
//! only after the write succeeded.

pub mod conversations;
pub mod messages;
pub mod read_state;

pub use conversations::*;
pub use messages::*;
pub use read_state::*;
