//! Badge poller lifecycle: ticks only under the customer role, converges
//! the badge count, and cancels on role changes and teardown.

use std::time::Duration;

use soko_client::auth::Credentials;
use soko_client::cart::{CartBadgePoller, CartController};
use soko_client::session::SessionStore;
use soko_core::ProductId;
use soko_integration_tests::{StubCommerce, TestTab, test_config};

const POLL_PERIOD: Duration = Duration::from_millis(50);
const SETTLE: Duration = Duration::from_millis(300);

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
async fn poller_ticks_while_customer_and_converges_badge() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "wanjiku").await;

    let controller = CartController::new(tab.gateway.clone());
    controller
        .add_item(ProductId::new(101), 2)
        .await
        .expect("add succeeds");

    stub.clear_journal();
    let poller = CartBadgePoller::spawn(controller.clone(), &tab.context, POLL_PERIOD);

    tokio::time::sleep(SETTLE).await;
    assert!(
        stub.requests_matching("GET", "/cart") >= 2,
        "poller should have fetched repeatedly"
    );
    assert_eq!(controller.badge_count(), 2);

    poller.stop();
    tokio::time::sleep(POLL_PERIOD * 2).await;
    let after_stop = stub.requests_matching("GET", "/cart");
    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        stub.requests_matching("GET", "/cart"),
        after_stop,
        "a stopped poller must issue no further fetches"
    );
}

#[tokio::test]
async fn role_change_away_from_customer_cancels_ticking() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "wanjiku").await;

    let controller = CartController::new(tab.gateway.clone());
    let _poller = CartBadgePoller::spawn(controller, &tab.context, POLL_PERIOD);

    tokio::time::sleep(SETTLE).await;
    assert!(stub.requests_matching("GET", "/cart") >= 2);

    // The identity changes away from customer (sign out of this account,
    // sign in as the owner)
    tab.auth().logout();
    tab.auth()
        .login(&Credentials {
            username: "jane".to_string(),
            password: "pw".to_string(),
        })
        .await
        .expect("owner login succeeds");

    // Give the in-flight tick, if any, a moment to land
    tokio::time::sleep(POLL_PERIOD * 2).await;
    let after_switch = stub.requests_matching("GET", "/cart");

    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        stub.requests_matching("GET", "/cart"),
        after_switch,
        "the cancelled task must issue no further fetches"
    );
}

#[tokio::test]
async fn poller_stays_idle_for_non_customers() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "jane").await;

    let controller = CartController::new(tab.gateway.clone());
    let _poller = CartBadgePoller::spawn(controller, &tab.context, POLL_PERIOD);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        stub.requests_matching("GET", "/cart"),
        0,
        "owners have no cart badge to poll"
    );
}

#[tokio::test]
async fn poller_resumes_when_customer_role_returns() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "jane").await;

    let controller = CartController::new(tab.gateway.clone());
    let _poller = CartBadgePoller::spawn(controller, &tab.context, POLL_PERIOD);

    tokio::time::sleep(POLL_PERIOD * 2).await;
    assert_eq!(stub.requests_matching("GET", "/cart"), 0);

    // Switch to a customer account: ticking starts
    tab.auth().logout();
    tab.auth()
        .login(&Credentials {
            username: "wanjiku".to_string(),
            password: "pw".to_string(),
        })
        .await
        .expect("customer login succeeds");

    tokio::time::sleep(SETTLE).await;
    assert!(
        stub.requests_matching("GET", "/cart") >= 2,
        "ticking starts when the customer role becomes active"
    );
}

#[tokio::test]
async fn forced_teardown_stops_the_poller_via_identity_change() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let tab = tab_for(&stub, &dir, "wanjiku").await;

    let controller = CartController::new(tab.gateway.clone());
    let _poller = CartBadgePoller::spawn(controller, &tab.context, POLL_PERIOD);

    tokio::time::sleep(SETTLE).await;
    assert!(stub.requests_matching("GET", "/cart") >= 2);

    // The next poll is rejected; the gateway clears the session, the
    // identity goes absent, and the poller parks itself
    stub.reject_all_credentials(true);
    tokio::time::sleep(SETTLE).await;
    assert!(tab.context.identity().is_none());

    stub.clear_journal();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(
        stub.requests_matching("GET", "/cart"),
        0,
        "no fetches after the forced teardown"
    );
}
