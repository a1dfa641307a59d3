use crate::common::entity_ids::UserId;

/// Role name that grants access to every conversation.
pub const ADMIN_ROLE: &str = "admin";

/// Identity of the caller as seen by access control.
///
/// Built from a verified JWT; `is_admin` is trusted as-is since the token
/// signature was already checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Requester {
    pub fn new(user_id: UserId, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, false)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, true)
    }

    /// Derive the admin flag from a role set.
    pub fn from_roles<S: AsRef<str>>(user_id: UserId, roles: &[S]) -> Self {
        Self::new(user_id, roles.iter().any(|r| r.as_ref() == ADMIN_ROLE))
    }
}
