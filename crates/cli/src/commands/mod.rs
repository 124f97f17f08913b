//! Command implementations, one module per screen group.

pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod products;

use std::io::Write as _;

use soko_client::config::{ClientConfig, ConfigError};
use soko_client::error::ApiError;
use soko_client::gateway::RequestGateway;
use soko_client::guard::{self, Decision, Requirement};
use soko_client::session::{SessionContext, SessionStore};
use soko_core::Identity;
use thiserror::Error;

/// Errors surfaced to the user at the top level.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The gateway could not be built.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A guard decision redirected away from the requested screen.
    #[error("{0}")]
    Redirected(String),

    /// The command failed; the message is what the screen shows.
    #[error("{0}")]
    Failed(String),

    /// Reading the terminal failed.
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// The wired-up client stack shared by every command: one store, one
/// context ("tab"), one gateway.
pub struct App {
    pub config: ClientConfig,
    pub store: SessionStore,
    pub context: SessionContext,
    pub gateway: RequestGateway,
}

impl App {
    /// Load config and wire the session store, context, and gateway.
    pub fn bootstrap() -> Result<Self, ScreenError> {
        let config = ClientConfig::from_env()?;
        let store = SessionStore::open(&config.session_file);
        let context = SessionContext::attach(&store);
        let gateway = RequestGateway::new(&config, store.clone(), context.clone())?;
        Ok(Self {
            config,
            store,
            context,
            gateway,
        })
    }

    /// The auth flows for this context.
    #[must_use]
    pub fn auth(&self) -> soko_client::auth::AuthFlow {
        soko_client::auth::AuthFlow::new(
            self.gateway.clone(),
            self.store.clone(),
            self.context.clone(),
        )
    }

    /// The catalog client.
    #[must_use]
    pub fn catalog(&self) -> soko_client::catalog::CatalogClient {
        soko_client::catalog::CatalogClient::new(self.gateway.clone())
    }

    /// The cart controller for this context.
    #[must_use]
    pub fn cart(&self) -> soko_client::cart::CartController {
        soko_client::cart::CartController::new(self.gateway.clone())
    }

    /// The orders client.
    #[must_use]
    pub fn orders(&self) -> soko_client::orders::OrdersClient {
        soko_client::orders::OrdersClient::new(self.gateway.clone())
    }

    /// Gate a screen: allow, or turn the guard's redirect into the message
    /// the user sees.
    pub fn guard_screen(&self, requirement: Requirement) -> Result<Option<Identity>, ScreenError> {
        let identity = self.context.identity();
        match guard::evaluate(identity.as_ref(), requirement) {
            Decision::Allow => Ok(identity),
            Decision::RedirectLogin => Err(ScreenError::Redirected(
                "You are not signed in. Run `soko login` first.".to_string(),
            )),
            Decision::RedirectHome(role) => Err(ScreenError::Redirected(format!(
                "This screen is not available for your account type. Routing to {}.",
                role.dashboard_path()
            ))),
        }
    }
}

/// Ask a yes/no question on the terminal; only `y`/`yes` confirms.
pub fn confirm(prompt: &str) -> Result<bool, std::io::Error> {
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Render an API failure the way the screen should: validation with its
/// field messages, everything else per its class. Authentication rejection
/// has already torn the session down by the time it is rendered here.
pub fn render_api_error(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => {
            "Session expired. Please log in again (`soko login`).".to_string()
        }
        ApiError::Validation(errors) => {
            let mut lines = vec!["Please fix the errors in the form:".to_string()];
            for message in &errors.general {
                lines.push(format!("  - {message}"));
            }
            for (field, messages) in &errors.fields {
                for message in messages {
                    lines.push(format!("  - {field}: {message}"));
                }
            }
            lines.join("\n")
        }
        ApiError::PermissionDenied(message) => format!("Permission denied: {message}"),
        ApiError::NotFound(message) => format!("Not found: {message}"),
        ApiError::RateLimited(secs) => {
            format!("The service is busy. Please retry in {secs} seconds.")
        }
        ApiError::Http(_) => {
            "Cannot reach the server. Check your connection and try again.".to_string()
        }
        ApiError::Server(status) => {
            format!("The server had a problem (HTTP {status}). Please try again.")
        }
        ApiError::Malformed(_) => "Invalid data format received from server.".to_string(),
        ApiError::Url(message) => format!("Bad request URL: {message}"),
    }
}
