//! Soko storefront client library.
//!
//! The state/consistency layer of the storefront: everything that persists
//! identity across restarts and execution contexts, attaches credentials to
//! outbound requests, gates screens by role, and keeps a locally-displayed
//! cart converged with server-held cart state.
//!
//! # Architecture
//!
//! - [`session`] - durable [`session::SessionStore`] shared by all contexts,
//!   plus the per-context observable [`session::SessionContext`]
//! - [`gateway`] - the single outbound-request path; attaches the stored
//!   credential and force-tears-down the session on credential rejection
//! - [`guard`] - pure role-gating decisions consumed by every screen
//! - [`auth`] - login/register/logout flows, the only writers of the store
//! - [`catalog`] - one-shot catalog reads and owner catalog mutations
//! - [`cart`] - the server-authoritative [`cart::CartController`] and the
//!   role-gated [`cart::CartBadgePoller`]
//! - [`orders`] - order listing and owner dashboard aggregates
//!
//! # Example
//!
//! ```rust,ignore
//! use soko_client::{auth::AuthFlow, cart::CartController, config::ClientConfig};
//! use soko_client::gateway::RequestGateway;
//! use soko_client::session::{SessionContext, SessionStore};
//!
//! let config = ClientConfig::from_env()?;
//! let store = SessionStore::open(&config.session_file);
//! let context = SessionContext::attach(&store);
//! let gateway = RequestGateway::new(&config, store.clone(), context.clone())?;
//!
//! let auth = AuthFlow::new(gateway.clone(), store, context.clone());
//! let identity = auth.login(&credentials).await?;
//!
//! let cart = CartController::new(gateway);
//! cart.fetch_cart().await?;
//! println!("{} items", cart.badge_count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod orders;
pub mod session;

pub use error::{ApiError, FieldErrors};
