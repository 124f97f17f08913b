//! Cart screens (customers only).

use rust_decimal::Decimal;
use soko_client::cart::{CartBadgePoller, QuantityOutcome, RemoveOutcome};
use soko_client::gateway::AuthEvent;
use soko_client::guard::Requirement;
use soko_core::{Cart, CartItemId, ProductId, Role, format_ksh};

use super::{App, ScreenError, confirm, render_api_error};

/// Flat delivery-fee estimate shown in the order summary. Display only;
/// never part of cart state.
const DELIVERY_FEE_ESTIMATE: Decimal = Decimal::from_parts(300, 0, 0, false, 0);

/// Show the cart with the order summary.
pub async fn show(app: &App) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Customer))?;

    let controller = app.cart();
    let cart = match controller.fetch_cart().await {
        Ok(cart) => cart,
        Err(error) => {
            return Err(ScreenError::Failed(format!(
                "Failed to load cart. Please try again.\n{}",
                render_api_error(&error)
            )));
        }
    };

    if cart.is_empty() {
        println!("Your cart is empty.");
        println!("Start shopping to add items! Browse with `soko products list`.");
        return Ok(());
    }

    render_cart(&cart);
    Ok(())
}

/// Add a product to the cart.
pub async fn add(app: &App, product_id: i64, qty: u32) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Customer))?;

    let controller = app.cart();
    match controller.add_item(ProductId::new(product_id), qty).await {
        Ok(cart) => {
            println!("Added to cart! ({} items now)", cart.total_items);
            Ok(())
        }
        Err(error) => Err(ScreenError::Failed(format!(
            "Failed to add to cart.\n{}",
            render_api_error(&error)
        ))),
    }
}

/// Change an item's quantity.
pub async fn set(app: &App, item_id: i64, qty: u32) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Customer))?;

    let controller = app.cart();
    match controller.set_quantity(CartItemId::new(item_id), qty).await {
        Ok(QuantityOutcome::Updated) => {
            println!("Quantity updated. ({} items now)", controller.badge_count());
            Ok(())
        }
        Ok(QuantityOutcome::Floor) => {
            println!("Quantities never go below 1. Use `soko cart remove` to drop an item.");
            Ok(())
        }
        Ok(QuantityOutcome::Busy) => {
            println!("That item is still updating. Try again in a moment.");
            Ok(())
        }
        Err(error) => Err(ScreenError::Failed(format!(
            "Failed to update quantity.\n{}",
            render_api_error(&error)
        ))),
    }
}

/// Remove an item from the cart, after confirmation.
pub async fn remove(app: &App, item_id: i64, yes: bool) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Customer))?;

    if !yes && !confirm("Remove this item from cart?")? {
        println!("Kept the item.");
        return Ok(());
    }

    let controller = app.cart();
    match controller.remove_item(CartItemId::new(item_id)).await {
        Ok(RemoveOutcome::Removed) => {
            println!("Item removed. ({} items now)", controller.badge_count());
            Ok(())
        }
        Ok(RemoveOutcome::Busy) => {
            println!("That item is still updating. Try again in a moment.");
            Ok(())
        }
        Err(error) => Err(ScreenError::Failed(format!(
            "Failed to remove item.\n{}",
            render_api_error(&error)
        ))),
    }
}

/// Keep the badge count fresh until interrupted. Demonstrates the badge
/// poller's lifecycle: it ticks only while the customer role is active and
/// is cancelled on drop; a forced teardown ends the watch.
pub async fn watch(app: &App) -> Result<(), ScreenError> {
    app.guard_screen(Requirement::Role(Role::Customer))?;

    let controller = app.cart();
    let poller = CartBadgePoller::spawn(
        controller.clone(),
        &app.context,
        app.config.cart_poll_interval,
    );
    let mut auth_events = app.gateway.auth_events();
    let mut identity = app.context.watch();

    println!(
        "Watching cart (poll every {:?}, Ctrl-C to stop)...",
        app.config.cart_poll_interval
    );

    let mut last_shown: Option<u32> = None;
    let mut render = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = render.tick() => {
                let count = controller.badge_count();
                if last_shown != Some(count) {
                    println!("Cart: {count} item(s)");
                    last_shown = Some(count);
                }
            }
            event = auth_events.recv() => {
                if matches!(event, Ok(AuthEvent::SessionRevoked)) {
                    poller.stop();
                    return Err(ScreenError::Redirected(
                        "Session expired. Please log in again (`soko login`).".to_string(),
                    ));
                }
            }
            changed = identity.changed() => {
                if changed.is_err() {
                    poller.stop();
                    return Ok(());
                }
                let still_customer = identity
                    .borrow()
                    .as_ref()
                    .is_some_and(|i| i.role == Role::Customer);
                if !still_customer {
                    // The poller has already cancelled its ticking
                    println!("No longer shopping as a customer; stopping the watch.");
                    poller.stop();
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                poller.stop();
                println!("Stopped.");
                return Ok(());
            }
        }
    }
}

fn render_cart(cart: &Cart) {
    println!("Your Shopping Cart");
    println!("==================");
    for item in &cart.items {
        println!(
            "#{:<4} {:<28} {:>12} x{:<3} = {}",
            item.id.as_i64(),
            item.product.name,
            format_ksh(item.product.price),
            item.quantity,
            format_ksh(item.subtotal)
        );
    }
    println!();
    println!("Order Summary");
    println!(
        "  Items ({:>3})             {}",
        cart.total_items,
        format_ksh(cart.total_price)
    );
    println!(
        "  Delivery Fee (estimate)  {}",
        format_ksh(DELIVERY_FEE_ESTIMATE)
    );
    println!(
        "  Total                    {}",
        format_ksh(cart.total_price + DELIVERY_FEE_ESTIMATE)
    );
    println!();
    println!("Checkout is not available yet. (Payment integration coming soon)");
}
