//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use crate::types::id::UserId;
use crate::types::role::Role;

/// The authenticated user as returned by the commerce service.
///
/// Exists only paired with a credential - an identity is never persisted or
/// held without the token that proves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User's database ID.
    pub id: UserId,
    /// Login name, shown in navigation.
    pub username: String,
    /// Account role.
    pub role: Role,
}

impl Identity {
    /// Whether this identity carries the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
