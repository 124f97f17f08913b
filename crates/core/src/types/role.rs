//! Account roles and role-based routing targets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account role assigned by the commerce service at registration.
///
/// Determines which screens and mutations are permitted: owners manage the
/// catalog and see the shop dashboard, customers shop and hold a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Customer,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Customer => "customer",
        }
    }

    /// The role's own dashboard path, used for role-based redirects.
    #[must_use]
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Self::Owner => "/owner/dashboard",
            Self::Customer => "/customer/dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, Error)]
#[error("unknown role: {0:?} (expected \"owner\" or \"customer\")")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "customer" => Ok(Self::Customer),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}
