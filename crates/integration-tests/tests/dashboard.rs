//! Owner dashboard: order listing and client-side aggregation.

use rust_decimal::Decimal;
use soko_client::ApiError;
use soko_client::auth::Credentials;
use soko_client::catalog::CatalogClient;
use soko_client::orders::{DashboardStats, OrdersClient};
use soko_client::session::SessionStore;
use soko_integration_tests::{StubCommerce, TestTab, test_config};

async fn tab_for(stub: &StubCommerce, dir: &tempfile::TempDir, username: &str) -> TestTab {
    let config = test_config(stub, dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);
    tab.auth()
        .login(&Credentials {
            username: username.to_string(),
            password: "pw".to_string(),
        })
        .await
        .expect("login succeeds");
    tab
}

#[tokio::test]
async fn owner_dashboard_aggregates_listings() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "jane").await;

    let products = CatalogClient::new(tab.gateway.clone())
        .list_products()
        .await
        .expect("products listed");
    let orders = OrdersClient::new(tab.gateway.clone())
        .list_orders()
        .await
        .expect("orders listed");

    let stats = DashboardStats::compute(&products, &orders);
    assert_eq!(stats.total_products, 3);
    // Seeded cooking oil sits at 3 units
    assert_eq!(stats.low_stock_products, 1);
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_sales, Decimal::new(200_000, 2));
}

#[tokio::test]
async fn customers_cannot_list_orders() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "wanjiku").await;

    let error = OrdersClient::new(tab.gateway.clone())
        .list_orders()
        .await
        .expect_err("customer denied");
    assert!(matches!(error, ApiError::PermissionDenied(_)));
}
