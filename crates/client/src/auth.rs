//! Login, registration, and logout flows.
//!
//! These flows are the only writers of the [`SessionStore`] besides the
//! gateway's forced teardown. Each successful authentication persists the
//! token/identity pair as one session and updates the context; logout
//! clears both. Registration validates locally before any network call and
//! surfaces per-field messages in the same shape the service uses.

use serde::{Deserialize, Serialize};
use soko_core::{Identity, Role};
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::{ApiError, FieldErrors};
use crate::gateway::RequestGateway;
use crate::session::{Session, SessionContext, SessionStore, SessionStoreError};

/// Errors from the authentication flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The service rejected the call (bad credentials surface as
    /// validation messages, expired sessions as `Unauthorized`).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session could not be persisted after a successful
    /// authentication. The context is left signed out.
    #[error("failed to persist session: {0}")]
    Store(#[from] SessionStoreError),

    /// Local validation rejected the form before any network call.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
}

/// Login credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration form. Role defaults to customer, matching the sign-up
/// screen's default account type.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
    /// Confirmation copy of the password; must match.
    pub password2: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
}

impl Registration {
    /// Validate the form locally: required fields present and the password
    /// confirmation matching. Runs before any network call.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any check fails.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.username.trim().is_empty() {
            errors.push_field("username", "Username is required");
        }
        if self.password.is_empty() {
            errors.push_field("password", "Password is required");
        }
        if self.password != self.password2 {
            errors.push_general("Passwords do not match");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Success shape of the auth endpoints.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: Identity,
}

/// The login/register/logout flows over the gateway and the shared store.
#[derive(Clone)]
pub struct AuthFlow {
    gateway: RequestGateway,
    store: SessionStore,
    context: SessionContext,
}

impl AuthFlow {
    /// Create the flows over this context's gateway and the shared store.
    #[must_use]
    pub const fn new(
        gateway: RequestGateway,
        store: SessionStore,
        context: SessionContext,
    ) -> Self {
        Self {
            gateway,
            store,
            context,
        }
    }

    /// Authenticate and establish a session.
    ///
    /// The caller routes by the returned identity's role: owners to the
    /// owner dashboard, customers to the customer dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the credentials or the
    /// session cannot be persisted.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let response: AuthResponse = self.gateway.post_json("auth/login", credentials).await?;
        self.establish(response)
    }

    /// Register a new account and establish a session, exactly as login
    /// does.
    ///
    /// # Errors
    ///
    /// Returns local validation errors before any network call, service
    /// rejections after.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<Identity, AuthError> {
        registration.validate().map_err(AuthError::Validation)?;
        let response: AuthResponse = self
            .gateway
            .post_json("auth/register", registration)
            .await?;
        self.establish(response)
    }

    /// Clear the session. No network call; the caller routes to the login
    /// screen.
    pub fn logout(&self) {
        self.store.clear();
        self.context.set(None);
        info!("signed out");
    }

    /// Persist the token/identity pair and update this context.
    fn establish(&self, response: AuthResponse) -> Result<Identity, AuthError> {
        let session = Session::new(response.token, response.user);
        self.store.save(&session)?;
        let identity = session.identity().clone();
        self.context.set(Some(identity.clone()));
        info!(username = %identity.username, role = %identity.role, "signed in");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "wanjiku".to_string(),
            email: None,
            password: "pw".to_string(),
            password2: "pw".to_string(),
            role: Role::Customer,
            contact_info: None,
        }
    }

    #[test]
    fn test_registration_valid() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_registration_password_mismatch() {
        let mut form = registration();
        form.password2 = "other".to_string();
        let errors = form.validate().expect_err("mismatch rejected");
        assert!(errors.general.contains(&"Passwords do not match".to_string()));
    }

    #[test]
    fn test_registration_missing_username() {
        let mut form = registration();
        form.username = "  ".to_string();
        let errors = form.validate().expect_err("username required");
        assert!(errors.fields.contains_key("username"));
    }

    #[test]
    fn test_registration_serializes_without_empty_options() {
        let json = serde_json::to_value(registration()).expect("serialize");
        assert!(json.get("email").is_none());
        assert_eq!(json["role"], "customer");
    }
}
