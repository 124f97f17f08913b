//! Periodic cart badge refresh.
//!
//! One supervised task keeps the navigation badge fresh: while the
//! observed identity has the customer role it ticks
//! [`CartController::fetch_cart`] on a fixed period, and the moment the
//! identity changes away from customer (logout, role switch, forced
//! teardown) the ticking stops. Dropping the poller aborts the task - a
//! leaked interval with no teardown path is a defect, not a feature.
//!
//! Poll responses and manual fetches read-replace the same cart state, so
//! whichever completes last wins; tick failures are logged and leave the
//! last-known-good cart untouched.

use std::time::Duration;

use soko_core::{Identity, Role};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::CartController;
use crate::session::SessionContext;

/// Cancellable periodic cart-count refresh, active only while the
/// identity has the customer role.
pub struct CartBadgePoller {
    handle: JoinHandle<()>,
}

impl CartBadgePoller {
    /// Spawn the poller against this context's identity. Ticking starts
    /// whenever the customer role becomes active and stops whenever it
    /// goes away; the task itself lives until [`stop`](Self::stop) or
    /// drop.
    #[must_use]
    pub fn spawn(controller: CartController, context: &SessionContext, period: Duration) -> Self {
        let identity = context.watch();
        let handle = tokio::spawn(run(controller, identity, period));
        Self { handle }
    }

    /// Cancel the poller. Equivalent to dropping it; no further fetches
    /// are issued afterwards.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for CartBadgePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn is_customer(identity: &watch::Receiver<Option<Identity>>) -> bool {
    identity
        .borrow()
        .as_ref()
        .is_some_and(|identity| identity.role == Role::Customer)
}

async fn run(
    controller: CartController,
    mut identity: watch::Receiver<Option<Identity>>,
    period: Duration,
) {
    loop {
        // Park until the customer role is active
        while !is_customer(&identity) {
            if identity.changed().await.is_err() {
                return;
            }
        }
        debug!("customer role active; starting cart badge ticks");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = controller.fetch_cart().await {
                        // Prior cart state is preserved; just report
                        warn!(%error, "cart badge refresh failed");
                    }
                }
                changed = identity.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !is_customer(&identity) {
                        debug!("identity left the customer role; cancelling cart badge ticks");
                        break;
                    }
                }
            }
        }
    }
}
