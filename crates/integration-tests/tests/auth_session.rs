//! Session lifecycle: login/register/logout, persistence, cross-context
//! propagation, and forced teardown on credential rejection.

use std::time::Duration;

use soko_client::ApiError;
use soko_client::auth::{AuthError, Credentials, Registration};
use soko_client::cart::CartController;
use soko_client::gateway::AuthEvent;
use soko_client::session::SessionStore;
use soko_core::Role;
use soko_integration_tests::{StubCommerce, TestTab, test_config};

fn jane() -> Credentials {
    Credentials {
        username: "jane".to_string(),
        password: "pw".to_string(),
    }
}

fn wanjiku() -> Credentials {
    Credentials {
        username: "wanjiku".to_string(),
        password: "pw".to_string(),
    }
}

#[tokio::test]
async fn login_establishes_session_and_owner_route() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let identity = tab.auth().login(&jane()).await.expect("login succeeds");

    assert_eq!(identity.username, "jane");
    assert_eq!(identity.role, Role::Owner);
    // The client then routes to the owner dashboard path
    assert_eq!(identity.role.dashboard_path(), "/owner/dashboard");

    // The issued token and the identity are persisted together
    let session = store.load().expect("session persisted");
    assert_eq!(session.credential(), "abc");
    assert_eq!(session.identity(), &identity);

    // The context observes the same identity
    assert_eq!(tab.context.identity().as_ref(), Some(&identity));
}

#[tokio::test]
async fn login_rejection_surfaces_form_message_and_persists_nothing() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let error = tab
        .auth()
        .login(&Credentials {
            username: "jane".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("bad password rejected");

    match error {
        AuthError::Api(ApiError::Validation(errors)) => {
            assert!(!errors.general.is_empty());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.load().is_none());
    assert!(tab.context.identity().is_none());
}

#[tokio::test]
async fn register_validates_locally_before_any_network_call() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let error = tab
        .auth()
        .register(&Registration {
            username: "otieno".to_string(),
            email: None,
            password: "pw".to_string(),
            password2: "other".to_string(),
            role: Role::Customer,
            contact_info: None,
        })
        .await
        .expect_err("mismatched passwords rejected");

    assert!(matches!(error, AuthError::Validation(_)));
    // Rejected locally: the stub never saw a register call
    assert_eq!(stub.requests_matching("POST", "/auth/register"), 0);
}

#[tokio::test]
async fn register_establishes_session_like_login() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let identity = tab
        .auth()
        .register(&Registration {
            username: "otieno".to_string(),
            email: Some("otieno@example.com".to_string()),
            password: "pw".to_string(),
            password2: "pw".to_string(),
            role: Role::Customer,
            contact_info: None,
        })
        .await
        .expect("registration succeeds");

    assert_eq!(identity.role, Role::Customer);
    let session = store.load().expect("session persisted");
    assert_eq!(session.identity().username, "otieno");
}

#[tokio::test]
async fn duplicate_username_surfaces_field_error() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let error = tab
        .auth()
        .register(&Registration {
            username: "jane".to_string(),
            email: None,
            password: "pw".to_string(),
            password2: "pw".to_string(),
            role: Role::Owner,
            contact_info: None,
        })
        .await
        .expect_err("duplicate rejected");

    match error {
        AuthError::Api(ApiError::Validation(errors)) => {
            assert!(errors.fields.contains_key("username"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn logout_clears_credential_and_identity_together() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    tab.auth().login(&wanjiku()).await.expect("login succeeds");
    assert!(store.load().is_some());

    tab.auth().logout();

    // One record holds both, so neither survives alone
    assert!(store.load().is_none());
    assert!(tab.context.identity().is_none());
}

#[tokio::test]
async fn logout_in_one_tab_is_observed_in_the_other() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);

    let tab_a = TestTab::open(&config, &store);
    let tab_b = TestTab::open(&config, &store);

    tab_a.auth().login(&wanjiku()).await.expect("login succeeds");

    let mut observed = tab_b.context.watch();
    // Wait until tab B has seen the login
    while observed.borrow().is_none() {
        observed.changed().await.expect("context alive");
    }

    tab_a.auth().logout();

    // Tab B converges to signed-out within one notification cycle,
    // without any reload
    tokio::time::timeout(Duration::from_secs(1), async {
        while observed.borrow().is_some() {
            observed.changed().await.expect("context alive");
        }
    })
    .await
    .expect("tab B observed the logout");
    assert!(tab_b.context.identity().is_none());
}

#[tokio::test]
async fn concurrent_credential_rejections_tear_down_exactly_once() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    tab.auth().login(&wanjiku()).await.expect("login succeeds");
    let mut events = tab.gateway.auth_events();

    // Every call from now on is rejected
    stub.reject_all_credentials(true);

    let controller = CartController::new(tab.gateway.clone());
    let (a, b, c) = tokio::join!(
        controller.fetch_cart(),
        controller.fetch_cart(),
        controller.fetch_cart()
    );
    for result in [a, b, c] {
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    // Storage is empty immediately after, and the revocation (the
    // navigate-to-login signal) fired exactly once
    assert!(store.load().is_none());
    assert!(tab.context.identity().is_none());

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event delivered")
        .expect("event channel alive");
    assert_eq!(event, AuthEvent::SessionRevoked);
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn anonymous_rejection_does_not_fire_revocation() {
    let stub = StubCommerce::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&stub, &dir);
    let store = SessionStore::open(&config.session_file);
    let tab = TestTab::open(&config, &store);

    let mut events = tab.gateway.auth_events();

    // No session: the cart endpoint rejects the bare request
    let controller = CartController::new(tab.gateway.clone());
    let result = controller.fetch_cart().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    // Nothing was cleared, so nothing is announced
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}
