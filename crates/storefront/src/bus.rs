//! Typed event bus.
//!
//! Components never call each other directly: views, the loader and the cart
//! client communicate by emitting [`Event`]s and listening for the
//! [`EventKind`]s they care about.
//!
//! Handlers run synchronously, in registration order, on the emitting task.
//! A panicking handler is caught and logged and the remaining handlers still
//! run. Handlers receive the bus and may emit further events; the listener
//! list is snapshotted before dispatch, so a handler registering or removing
//! listeners affects only later emits.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use heedless_core::{Cart, Collection, Email, Handle, Product, Quantity, VariantId};
use tracing::{debug, error};

use crate::shopify::LoadError;

/// Which drawer an open/close event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawer {
    Cart,
    Checkout,
}

/// Everything that can happen in the storefront.
///
/// `*Open`, `CartAdd`, `CheckoutSubmit` and `SearchInput` are commands
/// (something was requested); the rest are notifications (something
/// happened).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Collections
    CollectionOpen {
        handle: Handle,
    },
    CollectionLoading {
        handle: Handle,
    },
    CollectionReady {
        collection: Collection,
        products: Vec<Product>,
    },
    CollectionFailed {
        handle: Handle,
        error: LoadError,
    },

    // Products
    ProductOpen {
        handle: Handle,
    },
    ProductClose,
    /// A product fetch started. `stub` carries listing data to render while
    /// waiting, when the cache has any.
    ProductLoading {
        handle: Handle,
        stub: Option<Product>,
    },
    ProductReady {
        product: Product,
    },
    ProductFailed {
        handle: Handle,
        error: LoadError,
    },

    // Cart
    CartAdd {
        variant_id: VariantId,
        quantity: Quantity,
    },
    CartCreated {
        web_url: String,
    },
    CartUpdated {
        cart: Cart,
    },
    CartFailed {
        error: LoadError,
    },

    // Drawers
    DrawerOpen(Drawer),
    DrawerClose(Drawer),
    OverlayClose,

    // Search
    SearchInput {
        query: String,
    },
    SearchLoading {
        query: String,
    },
    SearchResults {
        query: String,
        products: Vec<Product>,
    },
    SearchFailed {
        query: String,
        error: LoadError,
    },
    SearchClose,

    // Checkout
    CheckoutSubmit {
        email: Email,
    },
    ShippingUpdated {
        countries: Vec<String>,
    },

    // Navigation
    HistoryPush {
        title: String,
        url: String,
    },
}

/// Fieldless discriminant of [`Event`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CollectionOpen,
    CollectionLoading,
    CollectionReady,
    CollectionFailed,
    ProductOpen,
    ProductClose,
    ProductLoading,
    ProductReady,
    ProductFailed,
    CartAdd,
    CartCreated,
    CartUpdated,
    CartFailed,
    DrawerOpen,
    DrawerClose,
    OverlayClose,
    SearchInput,
    SearchLoading,
    SearchResults,
    SearchFailed,
    SearchClose,
    CheckoutSubmit,
    ShippingUpdated,
    HistoryPush,
}

impl EventKind {
    /// `Component:action` name, as used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CollectionOpen => "Collection:open",
            Self::CollectionLoading => "Collection:loading",
            Self::CollectionReady => "Collection:ready",
            Self::CollectionFailed => "Collection:failed",
            Self::ProductOpen => "Product:open",
            Self::ProductClose => "Product:close",
            Self::ProductLoading => "Product:loading",
            Self::ProductReady => "Product:ready",
            Self::ProductFailed => "Product:failed",
            Self::CartAdd => "Cart:add",
            Self::CartCreated => "Cart:created",
            Self::CartUpdated => "Cart:updated",
            Self::CartFailed => "Cart:failed",
            Self::DrawerOpen => "Drawer:open",
            Self::DrawerClose => "Drawer:close",
            Self::OverlayClose => "Overlay:close",
            Self::SearchInput => "Search:input",
            Self::SearchLoading => "Search:loading",
            Self::SearchResults => "Search:results",
            Self::SearchFailed => "Search:failed",
            Self::SearchClose => "Search:close",
            Self::CheckoutSubmit => "Checkout:submit",
            Self::ShippingUpdated => "Shipping:updated",
            Self::HistoryPush => "History:push",
        }
    }
}

impl Event {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CollectionOpen { .. } => EventKind::CollectionOpen,
            Self::CollectionLoading { .. } => EventKind::CollectionLoading,
            Self::CollectionReady { .. } => EventKind::CollectionReady,
            Self::CollectionFailed { .. } => EventKind::CollectionFailed,
            Self::ProductOpen { .. } => EventKind::ProductOpen,
            Self::ProductClose => EventKind::ProductClose,
            Self::ProductLoading { .. } => EventKind::ProductLoading,
            Self::ProductReady { .. } => EventKind::ProductReady,
            Self::ProductFailed { .. } => EventKind::ProductFailed,
            Self::CartAdd { .. } => EventKind::CartAdd,
            Self::CartCreated { .. } => EventKind::CartCreated,
            Self::CartUpdated { .. } => EventKind::CartUpdated,
            Self::CartFailed { .. } => EventKind::CartFailed,
            Self::DrawerOpen(_) => EventKind::DrawerOpen,
            Self::DrawerClose(_) => EventKind::DrawerClose,
            Self::OverlayClose => EventKind::OverlayClose,
            Self::SearchInput { .. } => EventKind::SearchInput,
            Self::SearchLoading { .. } => EventKind::SearchLoading,
            Self::SearchResults { .. } => EventKind::SearchResults,
            Self::SearchFailed { .. } => EventKind::SearchFailed,
            Self::SearchClose => EventKind::SearchClose,
            Self::CheckoutSubmit { .. } => EventKind::CheckoutSubmit,
            Self::ShippingUpdated { .. } => EventKind::ShippingUpdated,
            Self::HistoryPush { .. } => EventKind::HistoryPush,
        }
    }
}

/// Handle returned by [`EventBus::listen`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Arc<dyn Fn(&Event, &EventBus) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kinds: Vec<EventKind>,
    handler: Handler,
}

/// Publish/subscribe dispatcher for [`Event`]s.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every kind in `kinds`.
    pub fn listen<F>(&self, kinds: &[EventKind], handler: F) -> ListenerId
    where
        F: Fn(&Event, &Self) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                id,
                kinds: kinds.to_vec(),
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener registered for its kind.
    ///
    /// Returns how many handlers ran to completion. Emitting an event nobody
    /// listens for is a no-op.
    pub fn emit(&self, event: &Event) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|listener| listener.kinds.contains(&kind))
            .map(|listener| Arc::clone(&listener.handler))
            .collect();

        debug!(event = kind.name(), listeners = handlers.len(), "Emitting event");

        let mut completed = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event, self))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(ToString::to_string)
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    error!(event = kind.name(), panic = %message, "Event handler panicked");
                }
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push(log: &Arc<Mutex<Vec<String>>>, entry: &str) {
        log.lock().unwrap_or_else(PoisonError::into_inner).push(entry.to_string());
    }

    fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(&Event::ProductClose), 0);
    }

    #[test]
    fn test_handlers_run_in_registration_order_for_matching_kinds() {
        let bus = EventBus::new();
        let log = recorder();

        let (a, b, c) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
        bus.listen(&[EventKind::ProductClose], move |_, _| push(&a, "first"));
        bus.listen(&[EventKind::OverlayClose], move |_, _| push(&b, "other"));
        bus.listen(
            &[EventKind::OverlayClose, EventKind::ProductClose],
            move |_, _| push(&c, "second"),
        );

        assert_eq!(bus.emit(&Event::ProductClose), 2);
        assert_eq!(entries(&log), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_siblings() {
        let bus = EventBus::new();
        let log = recorder();

        bus.listen(&[EventKind::SearchClose], |_, _| panic!("boom"));
        let sibling = Arc::clone(&log);
        bus.listen(&[EventKind::SearchClose], move |_, _| push(&sibling, "ran"));

        assert_eq!(bus.emit(&Event::SearchClose), 1);
        assert_eq!(entries(&log), vec!["ran"]);
    }

    #[test]
    fn test_unlisten_and_reentrant_emit() {
        let bus = EventBus::new();
        let log = recorder();

        bus.listen(&[EventKind::DrawerClose], |_, bus| {
            bus.emit(&Event::OverlayClose);
        });
        let overlay = Arc::clone(&log);
        let id = bus.listen(&[EventKind::OverlayClose], move |_, _| push(&overlay, "overlay"));

        bus.emit(&Event::DrawerClose(Drawer::Cart));
        assert_eq!(entries(&log), vec!["overlay"]);

        assert!(bus.unlisten(id));
        assert!(!bus.unlisten(id));
        bus.emit(&Event::DrawerClose(Drawer::Cart));
        assert_eq!(entries(&log).len(), 1);
    }
}
