//! Session persistence and observation.
//!
//! A [`Session`] pairs the opaque credential issued at login with the
//! identity it proves. The pair is persisted as one record by
//! [`SessionStore`] - credential and identity are never stored or cleared
//! independently - and observed per execution context through
//! [`SessionContext`], which re-reads the store whenever any context
//! writes it.

mod context;
mod store;

pub use context::SessionContext;
pub use store::{SessionStore, SessionStoreError};

use secrecy::{ExposeSecret, SecretString};
use soko_core::Identity;

/// The pairing of credential and identity.
///
/// Invariant: one is never held without the other. The credential is kept
/// behind [`SecretString`] and exposed only at the header-attachment and
/// persistence boundaries.
#[derive(Clone)]
pub struct Session {
    credential: SecretString,
    identity: Identity,
}

impl Session {
    /// Pair a credential with the identity it proves.
    #[must_use]
    pub fn new(credential: impl Into<String>, identity: Identity) -> Self {
        Self {
            credential: SecretString::from(credential.into()),
            identity,
        }
    }

    /// The opaque token, exposed for the authorization header and the
    /// persisted record only.
    #[must_use]
    pub fn credential(&self) -> &str {
        self.credential.expose_secret()
    }

    /// The identity this session proves.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credential", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use soko_core::{Role, UserId};

    use super::*;

    #[test]
    fn test_debug_redacts_credential() {
        let session = Session::new(
            "very-secret-token",
            Identity {
                id: UserId::new(1),
                username: "jane".to_string(),
                role: Role::Owner,
            },
        );
        let debug_output = format!("{session:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("jane"));
        assert!(!debug_output.contains("very-secret-token"));
    }
}
