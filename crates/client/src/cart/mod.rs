//! Server-authoritative cart state.
//!
//! The [`CartController`] owns the cart as rendered, always derived from
//! the server: every mutation is followed by an unconditional refetch
//! rather than a locally applied delta, trading optimistic responsiveness
//! for convergence (subtotals and prices are never recomputed client-side
//! from a stale copy). Fetch failures leave the last-known-good cart
//! untouched.
//!
//! Overlapping reads - a manual fetch racing the badge poller - are
//! resolved by last-response-wins: whichever response completes last
//! replaces the displayed cart. That is the accepted reconciled-on-read
//! policy, not strict linearizability.

mod poller;

pub use poller::CartBadgePoller;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use soko_core::{Cart, CartItemId, ProductId};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Outcome of a quantity change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// The update was sent and the cart reconverged.
    Updated,
    /// Rejected locally: quantities never go below 1 (decrement at 1 is a
    /// no-op, never a removal). No network call was made.
    Floor,
    /// Rejected locally: this item already has a mutation in flight. No
    /// network call was made.
    Busy,
}

/// Outcome of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The item was removed and the cart reconverged.
    Removed,
    /// Rejected locally: this item already has a mutation in flight.
    Busy,
}

#[derive(Debug, Serialize)]
struct AddItemRequest {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

/// Single source of truth for the cart as rendered.
///
/// The in-memory cart is private to one context/view; only the session
/// store is shared across contexts.
#[derive(Clone)]
pub struct CartController {
    inner: Arc<CartInner>,
}

struct CartInner {
    gateway: RequestGateway,
    /// Last successfully fetched cart. `None` until the first fetch.
    state: Mutex<Option<Cart>>,
    /// Items with a mutation (and its follow-up refetch) in flight.
    in_flight: Mutex<HashSet<CartItemId>>,
}

impl CartController {
    /// Create a controller over the gateway. No cart is held until the
    /// first successful fetch.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            inner: Arc::new(CartInner {
                gateway,
                state: Mutex::new(None),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Fetch the cart and replace local state wholesale with the server's
    /// view. On failure the prior cart state is left untouched and the
    /// error is returned for the caller to display.
    ///
    /// # Errors
    ///
    /// Returns an error for transport or service failures; authentication
    /// rejection is handled upstream by the gateway.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart, ApiError> {
        let cart: Cart = self.inner.gateway.get_json("cart").await?;
        if !cart.totals_consistent() {
            // Server totals are still authoritative; this only flags drift
            warn!(
                total_items = cart.total_items,
                "fetched cart totals disagree with its lines"
            );
        }
        *lock(&self.inner.state) = Some(cart.clone());
        Ok(cart)
    }

    /// The cart as last fetched, if any fetch has succeeded.
    #[must_use]
    pub fn current(&self) -> Option<Cart> {
        lock(&self.inner.state).clone()
    }

    /// Item count for the navigation badge: `total_items` of the last
    /// successful fetch, or 0 before any fetch. Never fails.
    #[must_use]
    pub fn badge_count(&self) -> u32 {
        lock(&self.inner.state)
            .as_ref()
            .map_or(0, |cart| cart.total_items)
    }

    /// Whether this item has a mutation in flight (its quantity controls
    /// should be disabled; other items stay interactive).
    #[must_use]
    pub fn is_item_busy(&self, item_id: CartItemId) -> bool {
        lock(&self.inner.in_flight).contains(&item_id)
    }

    /// Add a product to the cart, then reconverge with a fresh fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the addition or the follow-up fetch fails.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<Cart, ApiError> {
        self.inner
            .gateway
            .post_unit(
                "cart/add",
                &AddItemRequest {
                    product_id,
                    quantity,
                },
            )
            .await?;
        self.fetch_cart().await
    }

    /// Change one item's quantity, then reconverge with a fresh fetch.
    ///
    /// Quantities below 1 are rejected locally with no network call, and an
    /// item with a mutation already in flight is left alone ([`QuantityOutcome::Busy`]).
    /// The item stays guarded until the follow-up fetch completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the update or the follow-up fetch fails; the
    /// displayed cart is left as it was.
    #[instrument(skip(self), fields(item_id = %item_id, quantity))]
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<QuantityOutcome, ApiError> {
        if quantity < 1 {
            return Ok(QuantityOutcome::Floor);
        }
        let Some(_guard) = self.begin_mutation(item_id) else {
            return Ok(QuantityOutcome::Busy);
        };

        self.inner
            .gateway
            .patch_unit(
                &format!("cart/items/{item_id}"),
                &UpdateQuantityRequest { quantity },
            )
            .await?;
        self.fetch_cart().await?;
        Ok(QuantityOutcome::Updated)
    }

    /// Remove one item, then reconverge with a fresh fetch. Callers obtain
    /// explicit user confirmation before invoking this; on failure the item
    /// stays in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion or the follow-up fetch fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<RemoveOutcome, ApiError> {
        let Some(_guard) = self.begin_mutation(item_id) else {
            return Ok(RemoveOutcome::Busy);
        };

        self.inner
            .gateway
            .delete_unit(&format!("cart/items/{item_id}"))
            .await?;
        self.fetch_cart().await?;
        Ok(RemoveOutcome::Removed)
    }

    /// Claim the per-item mutation guard. Returns `None` when the item is
    /// already mutating; the guard releases on drop, so errors and early
    /// returns unlock too.
    fn begin_mutation(&self, item_id: CartItemId) -> Option<MutationGuard> {
        if lock(&self.inner.in_flight).insert(item_id) {
            Some(MutationGuard {
                inner: Arc::clone(&self.inner),
                item_id,
            })
        } else {
            None
        }
    }
}

/// RAII guard for one item's in-flight mutation.
struct MutationGuard {
    inner: Arc<CartInner>,
    item_id: CartItemId,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        lock(&self.inner.in_flight).remove(&self.item_id);
    }
}

/// Lock, recovering from poisoning: cart state stays usable even if a
/// panicking task held the lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
