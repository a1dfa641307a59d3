// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod id;
pub mod pagination;

pub use auth::{AuthError, Requester, ADMIN_ROLE};
pub use entity_ids::*;
pub use id::Id;
pub use pagination::{OffsetPagination, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
