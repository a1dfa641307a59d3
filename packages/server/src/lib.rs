// Support Chat - API Core
//
// Backend for support conversations between customers and the admin side:
// conversations, paginated message history, read state and a live change
// feed over SSE.
//
// Business logic lives per-domain in domains/*/actions/, SQL in domains/*/models/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
