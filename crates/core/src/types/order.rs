//! Order types consumed by the owner dashboard.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::OrderId;

/// An order as listed by the commerce service.
///
/// Only the fields the dashboard aggregates are modeled; a missing
/// `total_amount` counts as zero rather than failing the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Order total.
    #[serde(default)]
    pub total_amount: Decimal,
    /// Creation timestamp, when the serializer includes it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Free-form status string, when included.
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_total_defaults_to_zero() {
        let order: Order = serde_json::from_str(r#"{"id": 9}"#).expect("deserialize");
        assert_eq!(order.total_amount, Decimal::ZERO);
        assert!(order.created_at.is_none());
    }
}
