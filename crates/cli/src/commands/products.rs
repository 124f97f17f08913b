//! Catalog screens: listing for everyone, mutations for owners.

use std::path::PathBuf;

use soko_client::ApiError;
use soko_client::catalog::{ImageUpload, NewProduct};
use soko_client::guard::Requirement;
use soko_core::{ProductId, Role, format_ksh};

use super::{App, ScreenError, confirm, render_api_error};

/// List the catalog. Malformed listings degrade to an empty list plus the
/// error message, never a crash.
pub async fn list(app: &App) -> Result<(), ScreenError> {
    let identity = app.guard_screen(Requirement::Public)?;

    let products = match app.catalog().list_products().await {
        Ok(products) => products,
        Err(error @ ApiError::Malformed(_)) => {
            eprintln!("{}", render_api_error(&error));
            Vec::new()
        }
        Err(error) => return Err(ScreenError::Failed(render_api_error(&error))),
    };

    if let Some(identity) = &identity {
        println!("Welcome back, {}", identity.username);
    }
    println!("All Products");
    println!("------------");

    if products.is_empty() {
        println!("No products available at the moment.");
        return Ok(());
    }

    for product in &products {
        let mut line = format!(
            "#{:<4} {:<28} {:>14}  stock: {}",
            product.id.as_i64(),
            product.name,
            format_ksh(product.price),
            product.stock_quantity
        );
        if product.is_out_of_stock() {
            line.push_str(" (Out of stock)");
        } else if product.is_low_stock() {
            line.push_str(" (Low stock)");
        }
        println!("{line}");
        if let Some(description) = &product.description {
            let mut short: String = description.chars().take(80).collect();
            if description.chars().count() > 80 {
                short.push_str("...");
            }
            println!("      {short}");
        }
    }

    if identity.as_ref().is_some_and(|i| i.role == Role::Owner) {
        println!();
        println!("Add a new product with `soko products add`.");
    }
    Ok(())
}

/// List a new product (owners only).
pub async fn add(app: &App, form: NewProduct, image: Option<PathBuf>) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Owner))?;

    let image = match image {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            let file_name = path
                .file_name()
                .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
            Some(ImageUpload { file_name, bytes })
        }
        None => None,
    };

    match app.catalog().add_product(&form, image).await {
        Ok(created) => {
            println!("Product added successfully!");
            println!(
                "#{} {} at {}",
                created.id,
                created.name,
                format_ksh(created.price)
            );
            Ok(())
        }
        Err(error) => Err(ScreenError::Failed(render_api_error(&error))),
    }
}

/// Delete a product (owners only), after confirmation.
pub async fn delete(app: &App, id: i64, yes: bool) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Owner))?;

    if !yes && !confirm("Are you sure you want to delete this product?")? {
        println!("Kept the product.");
        return Ok(());
    }

    match app.catalog().delete_product(ProductId::new(id)).await {
        Ok(()) => {
            println!("Product deleted successfully.");
            Ok(())
        }
        Err(error) => Err(ScreenError::Failed(render_api_error(&error))),
    }
}
