//! Application context.
//!
//! [`App`] owns every component and is handed to whoever needs them; there
//! is no global state. Commands go through [`App::dispatch`], which announces
//! the event on the bus (so views can react immediately, e.g. with a
//! skeleton) and then does the async work the command asks for.

use std::sync::Arc;

use heedless_core::{Handle, HandleError};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::bus::{Drawer, Event, EventBus};
use crate::cache::StorageCache;
use crate::cart::CartClient;
use crate::config::StorefrontConfig;
use crate::loader::CatalogLoader;
use crate::search::SearchService;
use crate::shopify::StorefrontApi;
use crate::storage::KeyValueStore;
use crate::views::Page;

/// Tunables taken from configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Collection shown on `/`.
    pub frontpage: Handle,
    pub collection_limit: u32,
    pub search_limit: u32,
}

impl From<&StorefrontConfig> for AppSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            frontpage: config.frontpage.clone(),
            collection_limit: config.collection_limit,
            search_limit: config.search_limit,
        }
    }
}

/// Why a location could not be navigated to.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("No page at {0}")]
    UnknownPath(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(#[from] HandleError),
}

/// The storefront: bus, cache, loader, cart, search and page.
pub struct App<A> {
    bus: Arc<EventBus>,
    cache: Arc<StorageCache>,
    loader: CatalogLoader<A>,
    cart: CartClient<A>,
    search: SearchService<A>,
    page: Page,
    frontpage: Handle,
}

impl<A: StorefrontApi> App<A> {
    /// Wire up every component over `api` and `store`.
    pub fn new(api: Arc<A>, store: Arc<dyn KeyValueStore>, settings: AppSettings) -> Self {
        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(StorageCache::load(Arc::clone(&store)));
        let page = Page::attach(&bus);

        Self {
            loader: CatalogLoader::new(
                Arc::clone(&api),
                Arc::clone(&cache),
                Arc::clone(&bus),
                settings.collection_limit,
            ),
            cart: CartClient::load(
                Arc::clone(&api),
                store,
                Arc::clone(&cache),
                Arc::clone(&bus),
            ),
            search: SearchService::new(
                api,
                Arc::clone(&cache),
                Arc::clone(&bus),
                settings.search_limit,
            ),
            bus,
            cache,
            page,
            frontpage: settings.frontpage,
        }
    }

    /// Resume or create the cart and replay cached shipping countries.
    ///
    /// Failures are reported on the bus; the storefront still starts.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        if let Err(e) = self.cart.create_or_resume().await {
            warn!(error = %e, "Starting without a cart");
        }

        let countries = self.cache.shipping();
        if !countries.is_empty() {
            self.bus.emit(&Event::ShippingUpdated { countries });
        }
    }

    /// Announce `event` and carry out the work it asks for.
    ///
    /// Failures surface as `*Failed` events, rendered by the views.
    #[instrument(skip(self, event), fields(event = event.kind().name()))]
    pub async fn dispatch(&self, event: Event) {
        self.bus.emit(&event);

        let outcome = match event {
            Event::CollectionOpen { handle } => self
                .loader
                .open_collection(&handle)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Event::ProductOpen { handle } => self
                .loader
                .open_product(&handle)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Event::CartAdd {
                variant_id,
                quantity,
            } => self
                .cart
                .add_line_item(&variant_id, quantity)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Event::CheckoutSubmit { email } => self
                .cart
                .update_email(&email)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Event::SearchInput { query } => self
                .search
                .search(&query)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Event::DrawerOpen(Drawer::Checkout) => self
                .cart
                .shipping_countries()
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            _ => Ok(()),
        };

        if let Err(error) = outcome {
            debug!(error = %error, "Command failed; failure state rendered");
        }
    }

    /// Open whatever `path` (plus query string) points at.
    ///
    /// `/` shows the front-page collection, and `?product=h` on it opens that
    /// product over it; `/` without one closes any open product.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] for unknown paths or malformed handles.
    pub async fn navigate(&self, path: &str, query: Option<&str>) -> Result<(), NavigationError> {
        let product = query
            .into_iter()
            .flat_map(|q| url::form_urlencoded::parse(q.as_bytes()))
            .find(|(key, _)| key == "product")
            .map(|(_, value)| Handle::parse(&value))
            .transpose()?;

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] => {
                self.dispatch(Event::CollectionOpen {
                    handle: self.frontpage.clone(),
                })
                .await;
                match product {
                    Some(handle) => self.dispatch(Event::ProductOpen { handle }).await,
                    None if self.page.snapshot().current_product.is_some() => {
                        self.dispatch(Event::ProductClose).await;
                    }
                    None => {}
                }
            }
            ["collections", handle] => {
                self.dispatch(Event::CollectionOpen {
                    handle: Handle::parse(handle)?,
                })
                .await;
            }
            ["products", handle] => {
                self.dispatch(Event::ProductOpen {
                    handle: Handle::parse(handle)?,
                })
                .await;
            }
            _ => return Err(NavigationError::UnknownPath(path.to_string())),
        }
        Ok(())
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn cache(&self) -> &StorageCache {
        &self.cache
    }

    #[must_use]
    pub const fn loader(&self) -> &CatalogLoader<A> {
        &self.loader
    }

    #[must_use]
    pub const fn cart(&self) -> &CartClient<A> {
        &self.cart
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub const fn frontpage(&self) -> &Handle {
        &self.frontpage
    }
}

#[cfg(test)]
mod tests {
    use heedless_core::{LoadState, Quantity};

    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{FakeApi, full_product, handle, listing, variant_id};

    fn app(api: FakeApi) -> (App<FakeApi>, Arc<FakeApi>) {
        let api = Arc::new(api);
        let app = App::new(
            Arc::clone(&api),
            Arc::new(MemoryStore::new()),
            AppSettings {
                frontpage: handle("frontpage"),
                collection_limit: 5,
                search_limit: 3,
            },
        );
        (app, api)
    }

    #[tokio::test]
    async fn test_navigate_home_then_product() {
        let (app, api) = app(
            FakeApi::new()
                .with_listing(listing("frontpage", &["blue-mug", "teapot"]))
                .with_product(full_product("blue-mug")),
        );

        assert!(app.navigate("/", None).await.is_ok());
        assert!(app.page().snapshot().home.html.contains("js-product-card=\"teapot\""));

        assert!(app.navigate("/", Some("product=blue-mug")).await.is_ok());
        let state = app.page().snapshot();
        assert!(state.product.active);
        assert!(state.product.html.contains("All about blue-mug."));
        assert_eq!(app.loader().product_state(&handle("blue-mug")), LoadState::Complete);
        assert_eq!(api.calls("collection_by_handle"), 1);

        assert!(app.navigate("/", None).await.is_ok());
        assert!(!app.page().snapshot().product.active);
    }

    #[tokio::test]
    async fn test_navigate_rejects_unknown_and_bad_handles() {
        let (app, _) = app(FakeApi::new());

        assert!(matches!(
            app.navigate("/blog/news", None).await,
            Err(NavigationError::UnknownPath(_))
        ));
        assert!(matches!(
            app.navigate("/", Some("product=has%20space")).await,
            Err(NavigationError::InvalidHandle(_))
        ));
    }

    #[tokio::test]
    async fn test_init_creates_cart_and_add_updates_counter() {
        let (app, api) = app(FakeApi::new().with_product(full_product("blue-mug")));

        app.init().await;
        app.dispatch(Event::CartAdd {
            variant_id: variant_id("blue-mug"),
            quantity: Quantity::ONE,
        })
        .await;

        let state = app.page().snapshot();
        assert_eq!(api.calls("create_checkout"), 1);
        assert!(state.cart_counter.html.contains(">1<"));
        assert!(state.cart_drawer.active);
        assert!(state.checkout_link.is_some());
    }

    #[tokio::test]
    async fn test_opening_checkout_loads_countries() {
        let (app, api) = app(FakeApi::new());

        app.dispatch(Event::DrawerOpen(Drawer::Checkout)).await;

        assert_eq!(api.calls("ships_to_countries"), 1);
        assert!(app.page().snapshot().checkout_drawer.html.contains("<option value=\"GB\">"));
    }
}
