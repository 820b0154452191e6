//! Cache-first catalog loader.
//!
//! Opening a collection or product renders from the [`StorageCache`] when it
//! holds complete data and only goes to the network otherwise:
//!
//! ```text
//! Uncached ──► Loading ──► Complete
//!    Stub  ──► Loading ──► Complete
//!              Loading ──► Failed ──► (next open) Loading
//! ```
//!
//! Every outcome is announced on the [`EventBus`]: `*Loading` before a fetch,
//! then `*Ready` or `*Failed`. Concurrent opens of one handle share a single
//! fetch; the second caller waits for the first and then finds the cache warm.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};

use heedless_core::{Collection, Handle, LoadState, Product};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};

use crate::bus::{Event, EventBus};
use crate::cache::StorageCache;
use crate::shopify::{LoadError, StorefrontApi};

type InflightMap = HashMap<String, Arc<Mutex<()>>>;

/// Per-key async locks so only one fetch per handle is in flight.
///
/// An entry lives only while someone holds or waits on its lock.
#[derive(Default)]
struct FetchCoalescer {
    inflight: Arc<StdMutex<InflightMap>>,
}

impl FetchCoalescer {
    async fn acquire(&self, key: String) -> FetchPermit {
        let lock = Arc::clone(
            self.inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        let guard = Arc::clone(&lock).lock_owned().await;

        FetchPermit {
            guard: Some(guard),
            lock,
            key,
            inflight: Arc::clone(&self.inflight),
        }
    }
}

/// Held for the duration of one fetch.
struct FetchPermit {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<Mutex<()>>,
    key: String,
    inflight: Arc<StdMutex<InflightMap>>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this permit are the last holders: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2
            && inflight
                .get(&self.key)
                .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock))
        {
            inflight.remove(&self.key);
        }
    }
}

/// Loads collections and products through the cache.
pub struct CatalogLoader<A> {
    api: Arc<A>,
    cache: Arc<StorageCache>,
    bus: Arc<EventBus>,
    collection_limit: u32,
    coalescer: FetchCoalescer,
    /// `Loading`/`Failed` products; settled states live in the cache.
    transient: RwLock<HashMap<Handle, LoadState>>,
}

impl<A: StorefrontApi> CatalogLoader<A> {
    pub fn new(
        api: Arc<A>,
        cache: Arc<StorageCache>,
        bus: Arc<EventBus>,
        collection_limit: u32,
    ) -> Self {
        Self {
            api,
            cache,
            bus,
            collection_limit,
            coalescer: FetchCoalescer::default(),
            transient: RwLock::new(HashMap::new()),
        }
    }

    /// Where `handle` stands in the load state machine.
    #[must_use]
    pub fn product_state(&self, handle: &Handle) -> LoadState {
        let transient = self
            .transient
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .copied();
        match (transient, self.cache.product_state(handle)) {
            (_, LoadState::Complete) => LoadState::Complete,
            (Some(state), _) => state,
            (None, settled) => settled,
        }
    }

    /// Open a collection listing.
    ///
    /// A cached listing is emitted as `CollectionReady` straight away.
    /// Otherwise emits `CollectionLoading`, fetches the first
    /// `collection_limit` products and emits `CollectionReady` or
    /// `CollectionFailed`.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] that was emitted with `CollectionFailed`.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn open_collection(&self, handle: &Handle) -> Result<Collection, LoadError> {
        if let Some(collection) = self.cached_collection(handle) {
            return Ok(collection);
        }

        self.bus.emit(&Event::CollectionLoading {
            handle: handle.clone(),
        });

        let _guard = self.coalescer.acquire(format!("collection:{handle}")).await;
        if let Some(collection) = self.cached_collection(handle) {
            return Ok(collection);
        }

        match self.api.collection_by_handle(handle, self.collection_limit).await {
            Ok(listing) => {
                let collection = self.cache.merge_collection_listing(listing);
                self.bus.emit(&Event::CollectionReady {
                    products: self.cache.collection_products(handle),
                    collection: collection.clone(),
                });
                Ok(collection)
            }
            Err(e) => {
                warn!(error = %e, "Collection fetch failed");
                let error = LoadError::from(e);
                self.bus.emit(&Event::CollectionFailed {
                    handle: handle.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Open a product detail view.
    ///
    /// A complete cached product is emitted as `ProductReady` with no
    /// network call. A stub or missing product emits `ProductLoading`
    /// (carrying the stub, if any) and is fetched in full.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] that was emitted with `ProductFailed`.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn open_product(&self, handle: &Handle) -> Result<Product, LoadError> {
        if let Some(product) = self.complete_product(handle) {
            return Ok(product);
        }

        self.set_transient(handle, Some(LoadState::Loading));
        self.bus.emit(&Event::ProductLoading {
            handle: handle.clone(),
            stub: self.cache.product(handle),
        });

        let _guard = self.coalescer.acquire(format!("product:{handle}")).await;
        if let Some(product) = self.complete_product(handle) {
            self.set_transient(handle, None);
            return Ok(product);
        }

        match self.api.product_by_handle(handle).await {
            Ok(product) => {
                let merged = self.cache.merge_product(product);
                self.set_transient(handle, None);
                self.bus.emit(&Event::ProductReady {
                    product: merged.clone(),
                });
                Ok(merged)
            }
            Err(e) => {
                warn!(error = %e, "Product fetch failed");
                let error = LoadError::from(e);
                self.set_transient(handle, Some(LoadState::Failed));
                self.bus.emit(&Event::ProductFailed {
                    handle: handle.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn cached_collection(&self, handle: &Handle) -> Option<Collection> {
        let collection = self.cache.collection(handle)?;
        debug!(handle = %handle, "Collection served from cache");
        self.bus.emit(&Event::CollectionReady {
            products: self.cache.collection_products(handle),
            collection: collection.clone(),
        });
        Some(collection)
    }

    fn complete_product(&self, handle: &Handle) -> Option<Product> {
        let product = self.cache.product(handle).filter(|p| p.complete)?;
        debug!(handle = %handle, "Product served from cache");
        self.bus.emit(&Event::ProductReady {
            product: product.clone(),
        });
        Some(product)
    }

    fn set_transient(&self, handle: &Handle, state: Option<LoadState>) {
        let mut transient = self.transient.write().unwrap_or_else(PoisonError::into_inner);
        match state {
            Some(state) => {
                transient.insert(handle.clone(), state);
            }
            None => {
                transient.remove(handle);
            }
        }
    }
}
