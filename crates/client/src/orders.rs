//! Order listing and owner dashboard aggregates.

use rust_decimal::Decimal;
use soko_core::{Order, Product};
use tracing::instrument;

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Client for the orders surface.
#[derive(Clone)]
pub struct OrdersClient {
    gateway: RequestGateway,
}

impl OrdersClient {
    /// Create an orders client over the gateway.
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// List orders, tolerating the same two listing shapes the catalog
    /// uses (bare array or `{results: [...]}` envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing has an
    /// unexpected shape.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let value = self.gateway.get_value("orders").await?;
        crate::catalog::parse_listing(value, "order")
    }
}

/// The owner dashboard's headline numbers, aggregated client-side from the
/// product and order listings.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    /// Products currently listed.
    pub total_products: usize,
    /// Products at or below the low-stock threshold (but in stock).
    pub low_stock_products: usize,
    /// Orders placed.
    pub total_orders: usize,
    /// Sum of order totals.
    pub total_sales: Decimal,
}

impl DashboardStats {
    /// Aggregate the dashboard numbers from fetched listings.
    #[must_use]
    pub fn compute(products: &[Product], orders: &[Order]) -> Self {
        Self {
            total_products: products.len(),
            low_stock_products: products
                .iter()
                .filter(|product| product.is_low_stock())
                .count(),
            total_orders: orders.len(),
            total_sales: orders.iter().map(|order| order.total_amount).sum(),
        }
    }
}
