//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SOKO_API_BASE_URL` - Base URL of the commerce service API
//!   (default: `http://127.0.0.1:8000/api/`)
//! - `SOKO_SESSION_FILE` - Path of the durable session record
//!   (default: `$HOME/.soko/session.json`, falling back to
//!   `.soko/session.json` in the working directory)
//! - `SOKO_CART_POLL_SECS` - Cart badge poll period in seconds (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_SESSION_DIR: &str = ".soko";
const DEFAULT_SESSION_FILE: &str = "session.json";
const DEFAULT_CART_POLL_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all request paths are resolved against. Always ends with a
    /// trailing slash so relative joins keep the base path.
    pub api_base_url: Url,
    /// Durable session record location, shared by every context of this
    /// user.
    pub session_file: PathBuf,
    /// Period of the cart badge poller.
    pub cart_poll_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let raw_base = get_env_or_default("SOKO_API_BASE_URL", DEFAULT_API_BASE_URL);
        let api_base_url = parse_base_url(&raw_base)
            .map_err(|e| ConfigError::InvalidEnvVar("SOKO_API_BASE_URL".to_string(), e))?;

        let session_file = std::env::var("SOKO_SESSION_FILE")
            .map_or_else(|_| default_session_file(), PathBuf::from);

        let poll_secs = match std::env::var("SOKO_CART_POLL_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("SOKO_CART_POLL_SECS".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_CART_POLL_SECS,
        };

        Ok(Self {
            api_base_url,
            session_file,
            cart_poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

/// Parse and normalize the API base URL: must be absolute, and gains a
/// trailing slash so `Url::join` appends instead of replacing the last
/// path segment.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| e.to_string())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Default session record path under the user's home directory, or the
/// working directory when no home is available.
fn default_session_file() -> PathBuf {
    std::env::var("HOME").map_or_else(
        |_| PathBuf::from(DEFAULT_SESSION_DIR).join(DEFAULT_SESSION_FILE),
        |home| {
            PathBuf::from(home)
                .join(DEFAULT_SESSION_DIR)
                .join(DEFAULT_SESSION_FILE)
        },
    )
}
