//! Catalog reads and owner catalog mutations.
//!
//! The catalog is owned by the commerce service; this client only lists it
//! and, for shop owners, submits one-shot mutations. Plain listings are
//! cached briefly with `moka`; any mutation invalidates the cache.
//!
//! Listings tolerate both response shapes the service is known to emit - a
//! bare array and a `{results: [...]}` pagination envelope. Anything else
//! is a malformed response: the screen degrades to an empty list plus a
//! visible error, never a crash.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use soko_core::{Product, ProductId};
use tracing::{debug, instrument};

use crate::error::{ApiError, FieldErrors};
use crate::gateway::RequestGateway;

/// Listing cache TTL.
const CACHE_TTL: Duration = Duration::from_secs(300);
const PRODUCTS_CACHE_KEY: &str = "products";

/// A new product to list, as filled in on the add-product screen.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub barcode: Option<String>,
    pub sku: Option<String>,
}

impl NewProduct {
    /// Validate the form locally before any network call: name required,
    /// price strictly positive.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any check fails.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.push_field("name", "Product name is required");
        }
        if self.price <= Decimal::ZERO {
            errors.push_field("price", "Price must be a number greater than 0");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// An image to upload alongside a new product.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name reported to the service.
    pub file_name: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

/// Client for the shared product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    gateway: RequestGateway,
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl CatalogClient {
    /// Create a catalog client over the gateway.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(CACHE_TTL)
            .build();
        Self {
            inner: Arc::new(CatalogInner { gateway, cache }),
        }
    }

    /// List the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing has an
    /// unexpected shape; in both cases the screen shows the message over
    /// an empty list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.inner.cache.get(PRODUCTS_CACHE_KEY).await {
            debug!("cache hit for product listing");
            return Ok((*products).clone());
        }

        let value = self.inner.gateway.get_value("products").await?;
        let products = parse_listing(value, "product")?;

        self.inner
            .cache
            .insert(PRODUCTS_CACHE_KEY, Arc::new(products.clone()))
            .await;
        Ok(products)
    }

    /// List a new product (owners only). The service enforces the role;
    /// the form is validated locally first.
    ///
    /// # Errors
    ///
    /// Returns local validation errors before any network call, service
    /// rejections (validation, permission) after.
    #[instrument(skip(self, product, image), fields(name = %product.name))]
    pub async fn add_product(
        &self,
        product: &NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, ApiError> {
        product.validate().map_err(ApiError::Validation)?;

        let mut form = reqwest::multipart::Form::new()
            .text("name", product.name.trim().to_string())
            .text(
                "description",
                product
                    .description
                    .as_deref()
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            )
            .text("price", product.price.to_string())
            .text("stock_quantity", product.stock_quantity.to_string())
            .text(
                "barcode",
                product.barcode.as_deref().unwrap_or_default().to_string(),
            )
            .text("sku", product.sku.as_deref().unwrap_or_default().to_string());

        if let Some(image) = image {
            form = form.part(
                "image",
                reqwest::multipart::Part::bytes(image.bytes).file_name(image.file_name),
            );
        }

        let created: Product = self.inner.gateway.post_multipart("products/add", form).await?;
        self.invalidate_listing().await;
        Ok(created)
    }

    /// Delete a product (owners only). Callers confirm with the user
    /// before invoking this.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails; the listing is untouched.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), ApiError> {
        self.inner
            .gateway
            .delete_unit(&format!("products/{product_id}"))
            .await?;
        self.invalidate_listing().await;
        Ok(())
    }

    /// Drop the cached listing.
    pub async fn invalidate_listing(&self) {
        self.inner.cache.invalidate(PRODUCTS_CACHE_KEY).await;
    }
}

/// Accept both listing shapes: a bare array, or a pagination envelope with
/// a `results` array. Anything else is malformed.
pub(crate) fn parse_listing<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<Vec<T>, ApiError> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("results") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(ApiError::Malformed(format!(
                    "{what} listing is neither an array nor a results envelope"
                )));
            }
        },
        _ => {
            return Err(ApiError::Malformed(format!(
                "{what} listing is neither an array nor a results envelope"
            )));
        }
    };

    serde_json::from_value(serde_json::Value::Array(items))
        .map_err(|e| ApiError::Malformed(format!("{what} entry: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "name": "Fresh Sukuma Wiki",
            "price": "50.00",
            "stock_quantity": 150
        })
    }

    #[test]
    fn test_parse_bare_array() {
        let products: Vec<Product> = parse_listing(serde_json::json!([product_json()]), "product")
            .expect("bare array accepted");
        assert_eq!(products.len(), 1);
        assert_eq!(
            products.first().map(|p| p.name.as_str()),
            Some("Fresh Sukuma Wiki")
        );
    }

    #[test]
    fn test_parse_results_envelope() {
        let products: Vec<Product> = parse_listing(
            serde_json::json!({
                "count": 1,
                "next": null,
                "results": [product_json()]
            }),
            "product",
        )
        .expect("envelope accepted");
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn test_parse_unexpected_shape_is_malformed() {
        assert!(matches!(
            parse_listing::<Product>(serde_json::json!({"data": []}), "product"),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_listing::<Product>(serde_json::json!("nope"), "product"),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn test_new_product_validation() {
        let valid = NewProduct {
            name: "Avocado".to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            stock_quantity: 80,
            barcode: None,
            sku: None,
        };
        assert!(valid.validate().is_ok());

        let mut bad = valid;
        bad.name = String::new();
        bad.price = Decimal::ZERO;
        let errors = bad.validate().expect_err("rejected");
        assert!(errors.fields.contains_key("name"));
        assert!(errors.fields.contains_key("price"));
    }
}
