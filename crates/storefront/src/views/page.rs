//! The page: every region the views render into, plus navigation history.

use std::sync::{Arc, PoisonError, RwLock};

use askama::Template;
use heedless_core::{Cart, Handle};

use crate::bus::{Event, EventBus, EventKind};
use crate::shopify::LoadError;

use super::{cart_drawer, checkout_drawer, collection, product, render, search};

/// One fixed container on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub html: String,
    pub active: bool,
}

impl Region {
    pub(super) fn show(&mut self, html: String) {
        self.html = html;
        self.active = true;
    }

    pub(super) fn hide(&mut self) {
        self.active = false;
    }
}

/// A pushed navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
}

/// Rendered regions and the view inputs they were rendered from.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub home: Region,
    pub product: Region,
    pub cart_drawer: Region,
    pub checkout_drawer: Region,
    pub search: Region,
    pub overlay: Region,
    pub cart_counter: Region,
    /// Shopify-hosted checkout for the current cart.
    pub checkout_link: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// The product the shopper most recently asked for. Loads for any other
    /// handle are stale and never rendered.
    pub current_product: Option<Handle>,
    pub(super) cart: Option<Cart>,
    pub(super) cart_error: Option<LoadError>,
    pub(super) countries: Vec<String>,
    pub(super) checkout_pending: bool,
    pub(super) checkout_error: Option<LoadError>,
}

impl PageState {
    /// The overlay is up whenever a drawer is open.
    pub(super) fn sync_overlay(&mut self) {
        self.overlay.active = self.cart_drawer.active || self.checkout_drawer.active;
    }

    /// Title of the latest history entry.
    #[must_use]
    pub fn title(&self) -> &str {
        self.history.last().map_or("Heedless", |entry| entry.title.as_str())
    }
}

#[derive(Template)]
#[template(path = "layout.html")]
struct LayoutTemplate<'a> {
    title: &'a str,
    page: &'a PageState,
}

/// Shared handle to the page. Clones render into the same regions.
#[derive(Clone, Default)]
pub struct Page {
    state: Arc<RwLock<PageState>>,
}

impl Page {
    /// Create the page and subscribe every view to `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let page = Self::default();
        page.update(|state| {
            state.home.active = true;
            state.cart_drawer.html = cart_drawer::render_cart_drawer(None, None);
            state.cart_counter.show(cart_drawer::render_cart_count(0));
            state.checkout_drawer.html = checkout_drawer::render_for(state);
        });

        collection::listen(bus, &page);
        product::listen(bus, &page);
        cart_drawer::listen(bus, &page);
        checkout_drawer::listen(bus, &page);
        search::listen(bus, &page);

        let overlay = page.clone();
        bus.listen(&[EventKind::OverlayClose], move |_, _| {
            overlay.update(|state| {
                state.cart_drawer.hide();
                state.checkout_drawer.hide();
                state.sync_overlay();
            });
        });

        let history = page.clone();
        bus.listen(&[EventKind::HistoryPush], move |event, _| {
            if let Event::HistoryPush { title, url } = event {
                history.update(|state| {
                    if state.history.last().is_none_or(|last| &last.url != url) {
                        state.history.push(HistoryEntry {
                            title: title.clone(),
                            url: url.clone(),
                        });
                    }
                });
            }
        });

        page
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PageState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Render the full HTML document.
    #[must_use]
    pub fn render_document(&self) -> String {
        let page = self.snapshot();
        render(&LayoutTemplate {
            title: page.title(),
            page: &page,
        })
    }

    /// Mutate the state. Never emit from inside `f`: handlers for the
    /// emitted event would need the same lock.
    pub(super) fn update<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}
