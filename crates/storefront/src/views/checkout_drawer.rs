//! Checkout drawer: shipping country and email before handing off to Shopify.

use askama::Template;

use crate::bus::{Drawer, Event, EventBus, EventKind};

use super::{Page, PageState, render};

#[derive(Template)]
#[template(path = "checkout/drawer.html")]
struct CheckoutDrawerTemplate<'a> {
    countries: &'a [String],
    email: &'a str,
    has_checkout: bool,
    pending: bool,
    error: Option<&'a str>,
}

/// Render the checkout drawer.
#[must_use]
pub fn render_checkout_drawer(
    countries: &[String],
    email: Option<&str>,
    has_checkout: bool,
    pending: bool,
    error: Option<&str>,
) -> String {
    render(&CheckoutDrawerTemplate {
        countries,
        email: email.unwrap_or_default(),
        has_checkout,
        pending,
        error,
    })
}

pub(super) fn render_for(state: &PageState) -> String {
    render_checkout_drawer(
        &state.countries,
        state
            .cart
            .as_ref()
            .and_then(|cart| cart.email.as_ref())
            .map(|email| email.as_str()),
        state.checkout_link.is_some(),
        state.checkout_pending,
        state.checkout_error.as_ref().map(|error| error.headline()),
    )
}

pub(super) fn listen(bus: &EventBus, page: &Page) {
    let page = page.clone();
    bus.listen(
        &[
            EventKind::ShippingUpdated,
            EventKind::CheckoutSubmit,
            EventKind::CartUpdated,
            EventKind::CartFailed,
            EventKind::DrawerOpen,
            EventKind::DrawerClose,
        ],
        move |event, _| {
            page.update(|state| {
                match event {
                    Event::ShippingUpdated { countries } => {
                        state.countries.clone_from(countries);
                    }
                    Event::CheckoutSubmit { .. } => {
                        state.checkout_pending = true;
                        state.checkout_error = None;
                    }
                    Event::CartUpdated { .. } => {
                        state.checkout_pending = false;
                    }
                    Event::CartFailed { error } if state.checkout_pending => {
                        state.checkout_pending = false;
                        state.checkout_error = Some(error.clone());
                    }
                    Event::DrawerOpen(Drawer::Checkout) => {
                        state.checkout_drawer.active = true;
                        state.cart_drawer.hide();
                        state.sync_overlay();
                    }
                    Event::DrawerClose(Drawer::Checkout) => {
                        state.checkout_drawer.hide();
                        state.sync_overlay();
                    }
                    _ => return,
                }
                state.checkout_drawer.html = render_for(state);
            });
        },
    );
}

#[cfg(test)]
mod tests {
    use heedless_core::Email;

    use super::*;
    use crate::shopify::{LoadError, LoadErrorKind};

    #[test]
    fn test_countries_render_as_options_or_placeholder() {
        let html = render_checkout_drawer(&[], None, false, false, None);
        assert!(html.contains("js-skeleton=\"countries\""));
        assert!(!html.contains("/checkout/redirect"));

        let countries = vec!["GB".to_string(), "IE".to_string()];
        let html = render_checkout_drawer(&countries, Some("a@b.co"), true, false, None);
        assert!(html.contains("<option value=\"IE\">"));
        assert!(html.contains("value=\"a@b.co\""));
        assert!(html.contains("/checkout/redirect"));
    }

    #[test]
    fn test_submit_pending_then_failure() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::DrawerOpen(Drawer::Checkout));
        bus.emit(&Event::CheckoutSubmit {
            email: Email::parse("shopper@example.com").unwrap_or_else(|e| panic!("{e}")),
        });
        assert!(page.snapshot().checkout_drawer.html.contains("disabled"));

        bus.emit(&Event::CartFailed {
            error: LoadError::new(LoadErrorKind::Api, "Email is invalid"),
        });
        let state = page.snapshot();
        assert!(state.checkout_drawer.active);
        assert!(state.checkout_drawer.html.contains("js-failure"));
        assert!(!state.checkout_drawer.html.contains("disabled"));
    }
}
