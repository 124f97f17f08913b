//! Core types for Soko.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod identity;
pub mod money;
pub mod order;
pub mod product;
pub mod role;

pub use cart::{Cart, CartItem, ProductRef};
pub use id::*;
pub use identity::Identity;
pub use money::format_ksh;
pub use order::Order;
pub use product::{Product, ProductOwner};
pub use role::{Role, RoleParseError};
