//! Test scaffolding for the Soko client: an in-process stub of the
//! commerce service plus helpers for wiring client "tabs" against it.
//!
//! The stub implements the REST surface the client consumes - auth,
//! catalog, cart, orders - over in-memory state, journals every request
//! for assertions, and can be switched into modes the tests need:
//! rejecting every credential (forced teardown), serving paginated
//! listings, failing the next cart fetch, or delaying cart mutations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use soko_client::config::ClientConfig;
use soko_client::gateway::RequestGateway;
use soko_client::session::{SessionContext, SessionStore};
use soko_core::{
    Cart, CartItem, CartItemId, Identity, Product, ProductId, ProductOwner, ProductRef, Role,
    UserId,
};

// =============================================================================
// Stub state
// =============================================================================

/// One request as seen by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
}

#[derive(Clone)]
struct StubUser {
    token: String,
    password: String,
    identity: Identity,
}

/// Shared state behind the stub's routes.
pub struct StubState {
    users: Mutex<Vec<StubUser>>,
    products: Mutex<Vec<Product>>,
    carts: Mutex<HashMap<i64, Vec<CartItem>>>,
    orders: Mutex<Vec<Value>>,
    journal: Mutex<Vec<RequestRecord>>,
    reject_all: AtomicBool,
    paginated_listing: AtomicBool,
    fail_next_cart_fetch: AtomicBool,
    mutation_delay_ms: AtomicU64,
    next_id: AtomicI64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StubState {
    fn seeded() -> Self {
        let users = vec![
            StubUser {
                token: "abc".to_string(),
                password: "pw".to_string(),
                identity: Identity {
                    id: UserId::new(1),
                    username: "jane".to_string(),
                    role: Role::Owner,
                },
            },
            StubUser {
                token: "tok-wanjiku".to_string(),
                password: "pw".to_string(),
                identity: Identity {
                    id: UserId::new(2),
                    username: "wanjiku".to_string(),
                    role: Role::Customer,
                },
            },
        ];

        let products = vec![
            seed_product(101, "Fresh Sukuma Wiki", "50.00", 150),
            seed_product(102, "Avocado", "25.00", 80),
            seed_product(103, "Cooking Oil", "300.00", 3),
        ];

        let orders = vec![
            json!({"id": 1, "total_amount": "1200.00", "status": "paid"}),
            json!({"id": 2, "total_amount": "800.00", "status": "pending"}),
        ];

        Self {
            users: Mutex::new(users),
            products: Mutex::new(products),
            carts: Mutex::new(HashMap::new()),
            orders: Mutex::new(orders),
            journal: Mutex::new(Vec::new()),
            reject_all: AtomicBool::new(false),
            paginated_listing: AtomicBool::new(false),
            fail_next_cart_fetch: AtomicBool::new(false),
            mutation_delay_ms: AtomicU64::new(0),
            next_id: AtomicI64::new(1000),
        }
    }

    fn user_for_token(&self, token: &str) -> Option<StubUser> {
        lock(&self.users)
            .iter()
            .find(|user| user.token == token)
            .cloned()
    }

    fn authed(&self, headers: &HeaderMap) -> Option<StubUser> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Token ")?;
        self.user_for_token(token)
    }

    fn fresh_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn seed_product(id: i64, name: &str, price: &str, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: None,
        price: price.parse().unwrap_or(Decimal::ZERO),
        stock_quantity: stock,
        image: None,
        owner: Some(ProductOwner {
            id: UserId::new(1),
            username: Some("jane".to_string()),
        }),
        barcode: None,
        sku: None,
    }
}

// =============================================================================
// The stub service
// =============================================================================

/// An in-process commerce service bound to a local port.
pub struct StubCommerce {
    addr: SocketAddr,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl Drop for StubCommerce {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl StubCommerce {
    /// Bind and serve the stub on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound (test environment failure).
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::seeded());
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL for client configuration (with trailing slash).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Reject every request with 401 from now on.
    pub fn reject_all_credentials(&self, on: bool) {
        self.state.reject_all.store(on, Ordering::SeqCst);
    }

    /// Serve listings wrapped in a `{results: [...]}` envelope.
    pub fn paginate_listings(&self, on: bool) {
        self.state.paginated_listing.store(on, Ordering::SeqCst);
    }

    /// Fail the next `GET cart` with a 500, then recover.
    pub fn fail_next_cart_fetch(&self) {
        self.state.fail_next_cart_fetch.store(true, Ordering::SeqCst);
    }

    /// Delay cart mutations (PATCH/DELETE on items) by this long.
    pub fn delay_cart_mutations(&self, delay: Duration) {
        self.state
            .mutation_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    /// Everything the stub has served so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestRecord> {
        lock(&self.state.journal).clone()
    }

    /// Count of journaled requests matching a method and path prefix.
    #[must_use]
    pub fn requests_matching(&self, method: &str, path_prefix: &str) -> usize {
        lock(&self.state.journal)
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .count()
    }

    /// Forget the journal so far.
    pub fn clear_journal(&self) {
        lock(&self.state.journal).clear();
    }
}

// =============================================================================
// Client-side harness
// =============================================================================

/// One client "tab": a context and gateway over a session store. Tabs
/// sharing a store model multiple tabs of the same origin.
pub struct TestTab {
    pub store: SessionStore,
    pub context: SessionContext,
    pub gateway: RequestGateway,
}

impl TestTab {
    /// Open a tab over an existing store.
    ///
    /// # Panics
    ///
    /// Panics if the gateway cannot be built (test environment failure).
    #[must_use]
    pub fn open(config: &ClientConfig, store: &SessionStore) -> Self {
        let context = SessionContext::attach(store);
        let gateway = RequestGateway::new(config, store.clone(), context.clone())
            .expect("build gateway");
        Self {
            store: store.clone(),
            context,
            gateway,
        }
    }

    /// The auth flows for this tab.
    #[must_use]
    pub fn auth(&self) -> soko_client::auth::AuthFlow {
        soko_client::auth::AuthFlow::new(
            self.gateway.clone(),
            self.store.clone(),
            self.context.clone(),
        )
    }
}

/// Client configuration pointing at the stub, with the session record in a
/// fresh temp directory.
#[must_use]
pub fn test_config(stub: &StubCommerce, dir: &TempDir) -> ClientConfig {
    ClientConfig {
        api_base_url: stub.base_url().parse().expect("stub base url"),
        session_file: dir.path().join("session.json"),
        cart_poll_interval: Duration::from_millis(50),
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/products", get(list_products))
        .route("/products/add", post(add_product))
        .route("/products/{id}", axum::routing::delete(delete_product))
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route(
            "/cart/items/{id}",
            axum::routing::patch(update_cart_item).delete(remove_cart_item),
        )
        .route("/orders", get(list_orders))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            journal_and_gate,
        ))
        .with_state(state)
}

/// Journal every request and apply the forced-rejection switch.
async fn journal_and_gate(
    State(state): State<Arc<StubState>>,
    request: Request,
    next: Next,
) -> Response {
    lock(&state.journal).push(RequestRecord {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
    });

    if state.reject_all.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token."})),
        )
            .into_response();
    }

    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

fn forbidden(detail: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"detail": detail}))).into_response()
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": detail}))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<LoginBody>) -> Response {
    let user = lock(&state.users)
        .iter()
        .find(|user| user.identity.username == body.username && user.password == body.password)
        .cloned();

    match user {
        Some(user) => Json(json!({"token": user.token, "user": user.identity})).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["Invalid username or password."]})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    password: String,
    password2: String,
    role: Role,
}

async fn register(State(state): State<Arc<StubState>>, Json(body): Json<RegisterBody>) -> Response {
    if body.password != body.password2 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["Passwords do not match."]})),
        )
            .into_response();
    }

    let mut users = lock(&state.users);
    if users
        .iter()
        .any(|user| user.identity.username == body.username)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }

    let id = state.fresh_id();
    let user = StubUser {
        token: format!("tok-{}", body.username),
        password: body.password,
        identity: Identity {
            id: UserId::new(id),
            username: body.username,
            role: body.role,
        },
    };
    users.push(user.clone());

    Json(json!({"token": user.token, "user": user.identity})).into_response()
}

async fn list_products(State(state): State<Arc<StubState>>) -> Response {
    let products = lock(&state.products).clone();
    if state.paginated_listing.load(Ordering::SeqCst) {
        Json(json!({"count": products.len(), "next": null, "results": products})).into_response()
    } else {
        Json(products).into_response()
    }
}

async fn add_product(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let Some(user) = state.authed(&headers) else {
        return unauthorized();
    };
    if user.identity.role != Role::Owner {
        return forbidden("Only shop owners can add products.");
    }

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut image_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        if name == "image" {
            image_name = field.file_name().map(ToString::to_string);
            let _ = field.bytes().await;
        } else if let Ok(text) = field.text().await {
            fields.insert(name, text);
        }
    }

    let Some(price) = fields.get("price").and_then(|raw| raw.parse().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"price": ["A valid number is required."]})),
        )
            .into_response();
    };

    let product = Product {
        id: ProductId::new(state.fresh_id()),
        name: fields.get("name").cloned().unwrap_or_default(),
        description: fields.get("description").filter(|d| !d.is_empty()).cloned(),
        price,
        stock_quantity: fields
            .get("stock_quantity")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0),
        image: image_name.map(|name| format!("/media/{name}")),
        owner: Some(ProductOwner {
            id: user.identity.id,
            username: Some(user.identity.username),
        }),
        barcode: fields.get("barcode").filter(|b| !b.is_empty()).cloned(),
        sku: fields.get("sku").filter(|s| !s.is_empty()).cloned(),
    };

    lock(&state.products).push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn delete_product(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let Some(user) = state.authed(&headers) else {
        return unauthorized();
    };
    if user.identity.role != Role::Owner {
        return forbidden("Only shop owners can delete products.");
    }

    let mut products = lock(&state.products);
    let before = products.len();
    products.retain(|product| product.id.as_i64() != id);
    if products.len() == before {
        return not_found("Product not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

fn cart_response(items: &[CartItem]) -> Cart {
    Cart {
        items: items.to_vec(),
        total_items: items.iter().map(|item| item.quantity).sum(),
        total_price: items.iter().map(|item| item.subtotal).sum(),
    }
}

/// Resolve the calling customer, or the error response to return.
fn customer(state: &StubState, headers: &HeaderMap) -> Result<StubUser, Response> {
    let Some(user) = state.authed(headers) else {
        return Err(unauthorized());
    };
    if user.identity.role != Role::Customer {
        return Err(forbidden("Only customers can have carts."));
    }
    Ok(user)
}

async fn get_cart(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    let user = match customer(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    if state.fail_next_cart_fetch.swap(false, Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Temporary failure."})),
        )
            .into_response();
    }

    let carts = lock(&state.carts);
    let items = carts
        .get(&user.identity.id.as_i64())
        .cloned()
        .unwrap_or_default();
    Json(cart_response(&items)).into_response()
}

#[derive(Deserialize)]
struct AddToCartBody {
    product_id: i64,
    quantity: u32,
}

async fn add_to_cart(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<AddToCartBody>,
) -> Response {
    let user = match customer(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let product = lock(&state.products)
        .iter()
        .find(|product| product.id.as_i64() == body.product_id)
        .cloned();
    let Some(product) = product else {
        return not_found("Product not found.");
    };

    let mut carts = lock(&state.carts);
    let items = carts.entry(user.identity.id.as_i64()).or_default();

    if let Some(existing) = items
        .iter_mut()
        .find(|item| item.product.id == product.id)
    {
        existing.quantity += body.quantity;
        existing.subtotal = existing.product.price * Decimal::from(existing.quantity);
    } else {
        let quantity = body.quantity.max(1);
        items.push(CartItem {
            id: CartItemId::new(state.fresh_id()),
            product: ProductRef {
                id: product.id,
                name: product.name,
                price: product.price,
                image: product.image,
                stock_quantity: product.stock_quantity,
            },
            quantity,
            subtotal: product.price * Decimal::from(quantity),
        });
    }

    StatusCode::CREATED.into_response()
}

#[derive(Deserialize)]
struct UpdateQuantityBody {
    quantity: u32,
}

async fn update_cart_item(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateQuantityBody>,
) -> Response {
    let user = match customer(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let delay = state.mutation_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let mut carts = lock(&state.carts);
    let Some(item) = carts
        .get_mut(&user.identity.id.as_i64())
        .and_then(|items| items.iter_mut().find(|item| item.id.as_i64() == id))
    else {
        return not_found("Cart item not found.");
    };

    item.quantity = body.quantity;
    item.subtotal = item.product.price * Decimal::from(item.quantity);
    StatusCode::NO_CONTENT.into_response()
}

async fn remove_cart_item(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let user = match customer(&state, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let delay = state.mutation_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let mut carts = lock(&state.carts);
    let Some(items) = carts.get_mut(&user.identity.id.as_i64()) else {
        return not_found("Cart item not found.");
    };
    let before = items.len();
    items.retain(|item| item.id.as_i64() != id);
    if items.len() == before {
        return not_found("Cart item not found.");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_orders(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    let Some(user) = state.authed(&headers) else {
        return unauthorized();
    };
    if user.identity.role != Role::Owner {
        return forbidden("Only shop owners can list orders.");
    }
    Json(lock(&state.orders).clone()).into_response()
}
