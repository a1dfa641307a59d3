//! Authorization primitives shared by the HTTP layer and the chat domain.
//!
//! Authentication happens once in the JWT middleware; from there on the
//! domain only sees a [`Requester`], never raw claims.

mod errors;
mod requester;

pub use errors::AuthError;
pub use requester::{Requester, ADMIN_ROLE};
