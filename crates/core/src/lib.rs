//! Soko Core - Shared types library.
//!
//! This crate provides common types used across all Soko components:
//! - `client` - Storefront client library (sessions, catalog, cart sync)
//! - `cli` - Command-line storefront surface
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere, including tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, identities, catalog/cart/order types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
