//! Auth domain - the read-only side of the external auth service.
//!
//! Chat never issues credentials for real users; it verifies bearer JWTs and
//! reads the `users` table for emails and roles.

pub mod jwt;
pub mod models;

pub use jwt::{Claims, JwtService};
pub use models::User;
