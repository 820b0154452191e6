//! Cart drawer and cart counter.

use askama::Template;
use heedless_core::{Cart, LineItem};

use crate::bus::{Drawer, Event, EventBus, EventKind};
use crate::shopify::LoadError;

use super::{Page, render};

/// Cart line display data.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub variant_id: String,
    pub title: String,
    pub quantity: u32,
    pub line_total: Option<String>,
}

impl From<&LineItem> for CartLineView {
    fn from(item: &LineItem) -> Self {
        Self {
            variant_id: item.variant_id.to_string(),
            title: item
                .title
                .clone()
                .unwrap_or_else(|| "Item".to_string()),
            quantity: item.quantity.get(),
            line_total: item.line_total().map(|price| price.display()),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, Default)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_count: u64,
    pub total_cost: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.line_items().iter().map(CartLineView::from).collect(),
            total_count: cart.total_count(),
            total_cost: cart
                .total_cost()
                .map(|price| price.display())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "cart/drawer.html")]
struct CartDrawerTemplate<'a> {
    cart: CartView,
    error: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "partials/cart_count.html")]
struct CartCountTemplate {
    count: u64,
}

/// Render the drawer contents; `None` renders an empty cart.
#[must_use]
pub fn render_cart_drawer(cart: Option<&Cart>, error: Option<&LoadError>) -> String {
    render(&CartDrawerTemplate {
        cart: cart.map(CartView::from).unwrap_or_default(),
        error: error.map(LoadError::headline),
    })
}

#[must_use]
pub fn render_cart_count(count: u64) -> String {
    render(&CartCountTemplate { count })
}

pub(super) fn listen(bus: &EventBus, page: &Page) {
    let page = page.clone();
    bus.listen(
        &[
            EventKind::CartAdd,
            EventKind::CartCreated,
            EventKind::CartUpdated,
            EventKind::CartFailed,
            EventKind::DrawerOpen,
            EventKind::DrawerClose,
        ],
        move |event, _| {
            page.update(|state| match event {
                Event::CartCreated { web_url } => {
                    state.checkout_link = Some(web_url.clone());
                }
                Event::CartUpdated { cart } => {
                    state.checkout_link = Some(cart.web_url.clone());
                    state.cart_error = None;
                    state.cart_drawer.html = render_cart_drawer(Some(cart), None);
                    state.cart_counter.show(render_cart_count(cart.total_count()));
                    state.cart = Some(cart.clone());
                }
                Event::CartFailed { error } => {
                    state.cart_drawer.html = render_cart_drawer(state.cart.as_ref(), Some(error));
                    state.cart_error = Some(error.clone());
                }
                Event::CartAdd { .. } | Event::DrawerOpen(Drawer::Cart) => {
                    state.cart_drawer.show(render_cart_drawer(
                        state.cart.as_ref(),
                        state.cart_error.as_ref(),
                    ));
                    state.checkout_drawer.hide();
                    state.sync_overlay();
                }
                Event::DrawerClose(Drawer::Cart) => {
                    state.cart_drawer.hide();
                    state.sync_overlay();
                }
                _ => {}
            });
        },
    );
}

#[cfg(test)]
mod tests {
    use heedless_core::{CheckoutId, Quantity};

    use super::*;
    use crate::shopify::LoadErrorKind;
    use crate::testing::{gbp, variant_id};

    fn cart() -> Cart {
        let mut cart = Cart::new(
            CheckoutId::new("gid://shopify/Checkout/1"),
            "https://heedless.test/checkouts/1".to_string(),
        );
        cart.replace_line_items(vec![LineItem {
            title: Some("Blue Mug".to_string()),
            price: Some(gbp(1200)),
            ..LineItem::new(
                variant_id("blue-mug"),
                Quantity::new(2).unwrap_or_else(|e| panic!("{e}")),
            )
        }]);
        cart
    }

    #[test]
    fn test_drawer_lists_lines_and_total() {
        let html = render_cart_drawer(Some(&cart()), None);

        assert!(html.contains("Blue Mug"));
        assert!(html.contains("£24.00"));
        assert!(html.contains("Your cart (2)"));
    }

    #[test]
    fn test_updates_drive_counter_link_and_errors() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::CartUpdated { cart: cart() });
        let state = page.snapshot();
        assert!(state.cart_counter.html.contains(">2<"));
        assert_eq!(
            state.checkout_link.as_deref(),
            Some("https://heedless.test/checkouts/1")
        );

        bus.emit(&Event::CartFailed {
            error: LoadError::new(LoadErrorKind::Network, "timed out"),
        });
        let drawer = page.snapshot().cart_drawer.html;
        assert!(drawer.contains("js-failure"));
        assert!(drawer.contains("Blue Mug"));
    }

    #[test]
    fn test_add_opens_drawer_over_checkout() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::DrawerOpen(Drawer::Checkout));
        bus.emit(&Event::CartAdd {
            variant_id: variant_id("blue-mug"),
            quantity: Quantity::ONE,
        });

        let state = page.snapshot();
        assert!(state.cart_drawer.active);
        assert!(!state.checkout_drawer.active);
        assert!(state.overlay.active);
    }
}
