//! Sign-in, sign-up, sign-out screens.

use soko_client::auth::{AuthError, Credentials, Registration};
use soko_core::Role;

use super::{App, ScreenError, render_api_error};

/// Sign in and route to the role's dashboard.
pub async fn login(app: &App, username: String, password: String) -> Result<(), ScreenError> {
    let credentials = Credentials { username, password };

    match app.auth().login(&credentials).await {
        Ok(identity) => {
            println!("Welcome back, {}!", identity.username);
            println!("Routing to {}.", identity.role.dashboard_path());
            Ok(())
        }
        Err(AuthError::Api(error)) => {
            // Bad credentials come back as form-level validation messages
            let message = match &error {
                soko_client::ApiError::Validation(errors) if !errors.general.is_empty() => {
                    errors.general.join("; ")
                }
                soko_client::ApiError::Validation(_) => {
                    "Invalid username or password. Please try again.".to_string()
                }
                other => render_api_error(other),
            };
            Err(ScreenError::Failed(message))
        }
        Err(error) => Err(ScreenError::Failed(error.to_string())),
    }
}

/// Create an account and sign in.
pub async fn register(
    app: &App,
    username: String,
    password: String,
    confirm: String,
    email: Option<String>,
    role: &str,
    contact: Option<String>,
) -> Result<(), ScreenError> {
    let role: Role = role
        .parse()
        .map_err(|e: soko_core::RoleParseError| ScreenError::Failed(e.to_string()))?;

    let registration = Registration {
        username,
        email: email.filter(|value| !value.trim().is_empty()),
        password,
        password2: confirm,
        role,
        contact_info: contact,
    };

    match app.auth().register(&registration).await {
        Ok(identity) => {
            println!("Account created. Welcome to Soko, {}!", identity.username);
            println!("Routing to {}.", identity.role.dashboard_path());
            Ok(())
        }
        Err(AuthError::Validation(errors)) => Err(ScreenError::Failed(render_api_error(
            &soko_client::ApiError::Validation(errors),
        ))),
        Err(AuthError::Api(error)) => Err(ScreenError::Failed(render_api_error(&error))),
        Err(error) => Err(ScreenError::Failed(error.to_string())),
    }
}

/// Sign out and route to the login screen.
pub fn logout(app: &App) {
    app.auth().logout();
    println!("Signed out. Routing to /login.");
}

/// Show the signed-in identity, if any.
pub fn whoami(app: &App) {
    match app.context.identity() {
        Some(identity) => println!(
            "{} ({}), id {}",
            identity.username, identity.role, identity.id
        ),
        None => println!("Not signed in."),
    }
}
