//! Owner dashboard screen.

use soko_client::guard::Requirement;
use soko_client::orders::DashboardStats;
use soko_core::{Role, format_ksh};

use super::{App, ScreenError, render_api_error};

/// Show the shop overview: headline numbers aggregated from the product
/// and order listings.
pub async fn show(app: &App) -> Result<(), ScreenError> {
    let identity = app.guard_screen(Requirement::Role(Role::Owner))?;

    let catalog = app.catalog();
    let orders_client = app.orders();
    let (products, orders) = tokio::join!(catalog.list_products(), orders_client.list_orders());

    let products = products.map_err(|e| ScreenError::Failed(render_api_error(&e)))?;
    let orders = orders.map_err(|e| ScreenError::Failed(render_api_error(&e)))?;

    let stats = DashboardStats::compute(&products, &orders);

    if let Some(identity) = identity {
        println!("Welcome back, {}", identity.username);
        println!("Here's what's happening with your shop");
        println!();
    }
    println!("Total Sales      {}", format_ksh(stats.total_sales));
    println!("Total Orders     {}", stats.total_orders);
    println!("Low Stock Items  {}", stats.low_stock_products);
    println!("Total Products   {}", stats.total_products);
    Ok(())
}
