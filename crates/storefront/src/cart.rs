//! Cart/checkout client.
//!
//! The storefront keeps one cart, persisted under [`StorageKey::Cart`]. The
//! remote checkout is the source of truth for line items: every add reads
//! the remote lines, merges the new variant in and replaces the whole set,
//! then the local cart is rebuilt from the mutation response.
//!
//! Mutations are serialized so two adds never race each other's replace.

use std::sync::{Arc, PoisonError, RwLock};

use heedless_core::{Cart, Email, LineItem, Quantity, QuantityError, VariantId, merge_line_item};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::bus::{Event, EventBus};
use crate::cache::StorageCache;
use crate::shopify::{Checkout, LoadError, LoadErrorKind, ShopifyError, StorefrontApi};
use crate::storage::{self, KeyValueStore, StorageKey};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    #[error("Invalid quantity: {0}")]
    Quantity(#[from] QuantityError),
}

impl From<&CartError> for LoadError {
    fn from(error: &CartError) -> Self {
        match error {
            CartError::Shopify(e) => Self::from(e),
            CartError::Quantity(e) => Self::new(LoadErrorKind::Api, e.to_string()),
        }
    }
}

/// Creates, resumes and mutates the shopper's cart.
pub struct CartClient<A> {
    api: Arc<A>,
    store: Arc<dyn KeyValueStore>,
    cache: Arc<StorageCache>,
    bus: Arc<EventBus>,
    cart: RwLock<Option<Cart>>,
    mutation: Mutex<()>,
}

impl<A: StorefrontApi> CartClient<A> {
    /// Build a client, picking up a previously persisted cart if there is one.
    pub fn load(
        api: Arc<A>,
        store: Arc<dyn KeyValueStore>,
        cache: Arc<StorageCache>,
        bus: Arc<EventBus>,
    ) -> Self {
        let cart = match storage::get_json::<Cart>(store.as_ref(), StorageKey::Cart) {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored cart");
                None
            }
        };

        Self {
            api,
            store,
            cache,
            bus,
            cart: RwLock::new(cart),
            mutation: Mutex::new(()),
        }
    }

    /// The cart as last seen, if one exists.
    #[must_use]
    pub fn current(&self) -> Option<Cart> {
        self.cart.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resume the persisted cart, or create a remote checkout if there is none.
    ///
    /// Emits `CartCreated` with the checkout URL and then `CartUpdated`.
    /// Calling this again resumes the cart it created.
    ///
    /// # Errors
    ///
    /// Returns an error (after emitting `CartFailed`) if the checkout could
    /// not be created.
    #[instrument(skip(self))]
    pub async fn create_or_resume(&self) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        if let Some(cart) = self.current() {
            debug!(checkout_id = %cart.id, "Resuming cart");
            self.bus.emit(&Event::CartCreated {
                web_url: cart.web_url.clone(),
            });
            self.bus.emit(&Event::CartUpdated { cart: cart.clone() });
            return Ok(cart);
        }
        let result = self.ensure_cart().await;
        self.report(result)
    }

    /// Add `quantity` of a variant to the cart.
    ///
    /// A variant already in the cart has its quantity increased; the cart
    /// never holds two lines for one variant.
    ///
    /// # Errors
    ///
    /// Returns an error (after emitting `CartFailed`) if the remote checkout
    /// could not be read or updated.
    #[instrument(skip(self), fields(variant_id = %variant_id, quantity = quantity.get()))]
    pub async fn add_line_item(
        &self,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        let result = self.add_locked(variant_id, quantity).await;
        self.report(result)
    }

    /// Attach the shopper's email to the checkout.
    ///
    /// # Errors
    ///
    /// Returns an error (after emitting `CartFailed`) if Shopify rejects the
    /// update.
    #[instrument(skip(self, email))]
    pub async fn update_email(&self, email: &Email) -> Result<Cart, CartError> {
        let _guard = self.mutation.lock().await;
        let result = async {
            let cart = self.ensure_cart().await?;
            let remote = self.api.update_checkout_email(&cart.id, email).await?;
            Ok::<_, CartError>(self.recompute_totals(remote))
        }
        .await;
        self.report(result)
    }

    /// Country codes the shop ships to.
    ///
    /// Served from the storage cache when present, fetched and cached
    /// otherwise. Emits `ShippingUpdated`.
    ///
    /// # Errors
    ///
    /// Returns an error (after emitting `CartFailed`) if the fetch fails.
    #[instrument(skip(self))]
    pub async fn shipping_countries(&self) -> Result<Vec<String>, CartError> {
        let cached = self.cache.shipping();
        let countries = if cached.is_empty() {
            match self.api.ships_to_countries().await {
                Ok(countries) => {
                    self.cache.set_shipping(countries.clone());
                    countries
                }
                Err(e) => return self.report(Err(e.into())),
            }
        } else {
            debug!(countries = cached.len(), "Shipping countries served from cache");
            cached
        };

        self.bus.emit(&Event::ShippingUpdated {
            countries: countries.clone(),
        });
        Ok(countries)
    }

    /// Rebuild the local cart from a remote checkout.
    ///
    /// Lines missing a title or price are filled in from the product cache.
    /// Totals are recomputed, the cart is persisted and `CartUpdated` is
    /// emitted.
    pub fn recompute_totals(&self, remote: Checkout) -> Cart {
        let Checkout {
            id,
            web_url,
            email,
            line_items,
        } = remote;

        let line_items: Vec<LineItem> = line_items
            .into_iter()
            .map(|mut item| {
                if (item.title.is_none() || item.price.is_none())
                    && let Some((title, price)) = self.cache.variant_details(&item.variant_id)
                {
                    item.title.get_or_insert(title);
                    item.price.get_or_insert(price);
                }
                item
            })
            .collect();

        let mut cart = Cart::new(id, web_url);
        cart.email = email.as_deref().and_then(|e| Email::parse(e).ok());
        cart.replace_line_items(line_items);

        self.save(&cart);
        self.bus.emit(&Event::CartUpdated { cart: cart.clone() });
        cart
    }

    async fn add_locked(
        &self,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let cart = self.ensure_cart().await?;

        let remote = match self.api.checkout_line_items(&cart.id).await {
            Ok(remote) => remote,
            Err(ShopifyError::NotFound(_)) => {
                warn!(checkout_id = %cart.id, "Stored checkout is gone, starting a new cart");
                self.clear();
                let cart = self.ensure_cart().await?;
                self.api.checkout_line_items(&cart.id).await?
            }
            Err(e) => return Err(e.into()),
        };

        let mut line_items = remote.line_items;
        merge_line_item(&mut line_items, variant_id, quantity)?;

        let updated = self.api.replace_line_items(&remote.id, &line_items).await?;
        Ok(self.recompute_totals(updated))
    }

    /// The current cart, creating a remote checkout first if needed.
    ///
    /// Emits nothing for an existing cart; callers announce their own update.
    async fn ensure_cart(&self) -> Result<Cart, CartError> {
        if let Some(cart) = self.current() {
            return Ok(cart);
        }

        let checkout = self.api.create_checkout().await?;
        info!(checkout_id = %checkout.id, "Created checkout");
        self.bus.emit(&Event::CartCreated {
            web_url: checkout.web_url.clone(),
        });
        Ok(self.recompute_totals(checkout))
    }

    fn save(&self, cart: &Cart) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = Some(cart.clone());
        if let Err(e) = storage::set_json(self.store.as_ref(), StorageKey::Cart, cart) {
            error!(error = %e, "Failed to persist cart");
        }
    }

    fn clear(&self) {
        *self.cart.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(e) = self.store.remove(StorageKey::Cart) {
            error!(error = %e, "Failed to remove stored cart");
        }
    }

    fn report<T>(&self, result: Result<T, CartError>) -> Result<T, CartError> {
        if let Err(e) = &result {
            warn!(error = %e, "Cart operation failed");
            self.bus.emit(&Event::CartFailed { error: e.into() });
        }
        result
    }
}
