//! Role gating for screens.
//!
//! One pure decision function replaces the per-screen redirect checks:
//! every protected screen passes the requirement it carries and acts on the
//! returned [`Decision`]. Screens differ only in the requirement, never in
//! the redirect logic.

use soko_core::{Identity, Role};

/// What a screen requires of the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Role-agnostic screens (catalog browsing): anyone, anonymous
    /// included.
    Public,
    /// The visitor must hold exactly this role.
    Role(Role),
}

/// The outcome of evaluating a requirement against the current identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Show the screen.
    Allow,
    /// Not signed in: route to the login screen.
    RedirectLogin,
    /// Signed in under the wrong role: route to that role's own dashboard.
    RedirectHome(Role),
}

/// Evaluate a screen requirement against the current identity.
#[must_use]
pub fn evaluate(identity: Option<&Identity>, required: Requirement) -> Decision {
    match required {
        Requirement::Public => Decision::Allow,
        Requirement::Role(role) => match identity {
            None => Decision::RedirectLogin,
            Some(identity) if identity.role == role => Decision::Allow,
            Some(identity) => Decision::RedirectHome(identity.role),
        },
    }
}

#[cfg(test)]
mod tests {
    use soko_core::UserId;

    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new(1),
            username: "jane".to_string(),
            role,
        }
    }

    #[test]
    fn test_public_allows_everyone() {
        assert_eq!(evaluate(None, Requirement::Public), Decision::Allow);
        assert_eq!(
            evaluate(Some(&identity(Role::Owner)), Requirement::Public),
            Decision::Allow
        );
        assert_eq!(
            evaluate(Some(&identity(Role::Customer)), Requirement::Public),
            Decision::Allow
        );
    }

    #[test]
    fn test_anonymous_redirects_to_login() {
        assert_eq!(
            evaluate(None, Requirement::Role(Role::Customer)),
            Decision::RedirectLogin
        );
        assert_eq!(
            evaluate(None, Requirement::Role(Role::Owner)),
            Decision::RedirectLogin
        );
    }

    #[test]
    fn test_matching_role_allowed() {
        assert_eq!(
            evaluate(Some(&identity(Role::Customer)), Requirement::Role(Role::Customer)),
            Decision::Allow
        );
        assert_eq!(
            evaluate(Some(&identity(Role::Owner)), Requirement::Role(Role::Owner)),
            Decision::Allow
        );
    }

    #[test]
    fn test_wrong_role_redirects_to_own_dashboard() {
        // An owner on the cart screen is sent to the owner dashboard
        assert_eq!(
            evaluate(Some(&identity(Role::Owner)), Requirement::Role(Role::Customer)),
            Decision::RedirectHome(Role::Owner)
        );
        assert_eq!(
            evaluate(Some(&identity(Role::Customer)), Requirement::Role(Role::Owner)),
            Decision::RedirectHome(Role::Customer)
        );
    }
}
