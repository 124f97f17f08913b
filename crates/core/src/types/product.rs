//! Catalog product types.
//!
//! Products are owned and mutated by the commerce service; the client only
//! ever holds read projections of them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{ProductId, UserId};

/// Stock level at or below which a product counts as "low stock" on the
/// owner dashboard.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A catalog product as listed by the commerce service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Optional long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price, authoritative from the server.
    pub price: Decimal,
    /// Units currently in stock.
    pub stock_quantity: u32,
    /// Optional image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Shop owner that listed the product, when the serializer includes it.
    #[serde(default)]
    pub owner: Option<ProductOwner>,
    /// Optional barcode.
    #[serde(default)]
    pub barcode: Option<String>,
    /// Optional stock-keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
}

impl Product {
    /// Whether the product is out of stock.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }

    /// Whether the product counts as low stock (in stock, at or below the
    /// dashboard threshold).
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= LOW_STOCK_THRESHOLD
    }
}

/// Owner reference embedded in a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOwner {
    /// Owner's user ID.
    pub id: UserId,
    /// Owner's login name, when included.
    #[serde(default)]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Fresh Sukuma Wiki".to_string(),
            description: None,
            price: Decimal::new(5000, 2),
            stock_quantity: stock,
            image: None,
            owner: None,
            barcode: None,
            sku: None,
        }
    }

    #[test]
    fn test_stock_helpers() {
        assert!(product(0).is_out_of_stock());
        assert!(!product(0).is_low_stock());
        assert!(product(LOW_STOCK_THRESHOLD).is_low_stock());
        assert!(!product(LOW_STOCK_THRESHOLD + 1).is_low_stock());
    }

    #[test]
    fn test_deserialize_minimal_listing() {
        // Serializer output without the optional fields
        let json = r#"{"id": 3, "name": "Avocado", "price": "25.00", "stock_quantity": 80}"#;
        let product: Product = serde_json::from_str(json).expect("deserialize");
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(2500, 2));
        assert!(product.description.is_none());
        assert!(product.owner.is_none());
    }
}
