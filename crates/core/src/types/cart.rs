//! Server-authoritative cart types.
//!
//! The client never constructs a [`Cart`] locally - it is always the result
//! of a fetch, and every mutation is followed by a fresh fetch rather than a
//! locally computed projection. Totals therefore always reflect what the
//! server computed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{CartItemId, ProductId};

/// Read-only projection of catalog data embedded in a cart line.
///
/// Owned by the catalog service; treated as immutable for the duration of a
/// cart view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price, authoritative from the server.
    pub price: Decimal,
    /// Optional image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Units in stock at fetch time.
    #[serde(default)]
    pub stock_quantity: u32,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Cart line ID (distinct from the product ID).
    pub id: CartItemId,
    /// Product snapshot for this line.
    pub product: ProductRef,
    /// Quantity, always >= 1; removal is a distinct operation, never a
    /// quantity-zero update.
    pub quantity: u32,
    /// Server-computed line subtotal (`quantity x product.price`).
    pub subtotal: Decimal,
}

impl CartItem {
    /// Whether the server-computed subtotal matches `quantity x price`.
    #[must_use]
    pub fn line_consistent(&self) -> bool {
        self.subtotal == self.product.price * Decimal::from(self.quantity)
    }
}

/// The customer's cart as fetched from the commerce service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Ordered cart lines.
    pub items: Vec<CartItem>,
    /// Server-computed total item count.
    pub total_items: u32,
    /// Server-computed total price.
    pub total_price: Decimal,
}

impl Cart {
    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cross-check the server-computed totals against the lines:
    /// `total_items = sum(quantity)`, `total_price = sum(subtotal)`, and each
    /// line's subtotal matching its quantity and unit price.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        let item_sum: u32 = self.items.iter().map(|item| item.quantity).sum();
        let price_sum: Decimal = self.items.iter().map(|item| item.subtotal).sum();
        self.total_items == item_sum
            && self.total_price == price_sum
            && self.items.iter().all(CartItem::line_consistent)
    }
}
