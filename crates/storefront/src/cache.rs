//! Storage cache: the process-wide catalog mirror.
//!
//! Products and collections are keyed by handle and mirrored to the
//! [`KeyValueStore`] after every write, so a restart renders from the
//! previous session's data. Incoming records are folded in with
//! [`Product::merge`] and [`Collection::merge`]; nothing is ever evicted.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use heedless_core::{Collection, Handle, LoadState, Price, Product, VariantId, line_title};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::shopify::CollectionListing;
use crate::storage::{self, KeyValueStore, StorageKey};

#[derive(Debug, Default)]
struct CacheState {
    products: BTreeMap<Handle, Product>,
    collections: BTreeMap<Handle, Collection>,
    shipping: Vec<String>,
}

/// Catalog cache backed by a [`KeyValueStore`].
pub struct StorageCache {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<CacheState>,
}

impl StorageCache {
    /// Load the cache from `store`.
    ///
    /// A missing entry starts empty. A malformed entry is logged and also
    /// starts empty; it is overwritten on the next write.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let state = CacheState {
            products: load_or_default(store.as_ref(), StorageKey::Products),
            collections: load_or_default(store.as_ref(), StorageKey::Collections),
            shipping: load_or_default(store.as_ref(), StorageKey::Shipping),
        };

        debug!(
            products = state.products.len(),
            collections = state.collections.len(),
            "Storage cache loaded"
        );

        Self {
            store,
            state: RwLock::new(state),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn product(&self, handle: &Handle) -> Option<Product> {
        self.read().products.get(handle).cloned()
    }

    #[must_use]
    pub fn collection(&self, handle: &Handle) -> Option<Collection> {
        self.read().collections.get(handle).cloned()
    }

    /// Cached products of a collection, in listing order.
    ///
    /// Handles without a cached product are skipped.
    #[must_use]
    pub fn collection_products(&self, handle: &Handle) -> Vec<Product> {
        let state = self.read();
        state
            .collections
            .get(handle)
            .map(|collection| {
                collection
                    .product_handles
                    .iter()
                    .filter_map(|h| state.products.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the full detail for `handle` is cached.
    #[must_use]
    pub fn product_is_complete(&self, handle: &Handle) -> bool {
        self.read()
            .products
            .get(handle)
            .is_some_and(|product| product.complete)
    }

    /// Cache-only load state for a product: `Complete`, `Stub` or `Uncached`.
    #[must_use]
    pub fn product_state(&self, handle: &Handle) -> LoadState {
        match self.read().products.get(handle) {
            Some(product) if product.complete => LoadState::Complete,
            Some(_) => LoadState::Stub,
            None => LoadState::Uncached,
        }
    }

    /// Cart line title and unit price for a variant of any cached product.
    #[must_use]
    pub fn variant_details(&self, variant_id: &VariantId) -> Option<(String, Price)> {
        let state = self.read();
        state.products.values().find_map(|product| {
            product
                .variant(variant_id)
                .map(|variant| (line_title(&product.title, &variant.title), variant.price))
        })
    }

    /// Country codes the shop ships to, as last fetched.
    #[must_use]
    pub fn shipping(&self) -> Vec<String> {
        self.read().shipping.clone()
    }

    // =========================================================================
    // Writes (each persists)
    // =========================================================================

    /// Fold a product into the cache and return the merged record.
    pub fn merge_product(&self, product: Product) -> Product {
        let mut state = self.write();
        let merged = merge_into(&mut state.products, product);
        self.persist(StorageKey::Products, &state.products);
        merged
    }

    /// Fold a collection listing and its stub products into the cache.
    ///
    /// Returns the merged collection.
    pub fn merge_collection_listing(&self, listing: CollectionListing) -> Collection {
        let CollectionListing {
            collection,
            products,
        } = listing;

        let mut state = self.write();
        for product in products {
            merge_into(&mut state.products, product);
        }

        let merged = match state.collections.get_mut(&collection.handle) {
            Some(existing) => {
                existing.merge(collection);
                existing.clone()
            }
            None => {
                state
                    .collections
                    .insert(collection.handle.clone(), collection.clone());
                collection
            }
        };

        self.persist(StorageKey::Products, &state.products);
        self.persist(StorageKey::Collections, &state.collections);
        merged
    }

    /// Replace the shipping countries.
    pub fn set_shipping(&self, countries: Vec<String>) {
        let mut state = self.write();
        state.shipping = countries;
        self.persist(StorageKey::Shipping, &state.shipping);
    }

    /// Write `value` to the store. Callers hold the write lock, so stored
    /// snapshots land in the same order as the merges that produced them.
    fn persist<T: Serialize>(&self, key: StorageKey, value: &T) {
        if let Err(e) = storage::set_json(self.store.as_ref(), key, value) {
            error!(key = %key, error = %e, "Failed to persist storage cache entry");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn merge_into(products: &mut BTreeMap<Handle, Product>, product: Product) -> Product {
    match products.get_mut(&product.handle) {
        Some(existing) => {
            existing.merge(product);
            existing.clone()
        }
        None => {
            products.insert(product.handle.clone(), product.clone());
            product
        }
    }
}

fn load_or_default<T>(store: &dyn KeyValueStore, key: StorageKey) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match storage::get_json(store, key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unreadable storage entry");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{full_product, gbp, handle, listing, stub_product, variant_id};

    #[test]
    fn test_listing_merge_is_idempotent_and_ordered() {
        let cache = StorageCache::load(Arc::new(MemoryStore::new()));

        cache.merge_collection_listing(listing("frontpage", &["teapot", "blue-mug"]));
        let once = (
            cache.collection(&handle("frontpage")),
            cache.collection_products(&handle("frontpage")),
        );
        cache.merge_collection_listing(listing("frontpage", &["teapot", "blue-mug"]));
        let twice = (
            cache.collection(&handle("frontpage")),
            cache.collection_products(&handle("frontpage")),
        );

        assert_eq!(once, twice);
        let order: Vec<String> = twice.1.iter().map(|p| p.handle.to_string()).collect();
        assert_eq!(order, vec!["teapot", "blue-mug"]);
        assert_eq!(cache.product_state(&handle("teapot")), LoadState::Stub);
    }

    #[test]
    fn test_listing_never_downgrades_complete_product() {
        let cache = StorageCache::load(Arc::new(MemoryStore::new()));
        let mut full = stub_product("blue-mug", "frontpage");
        full.complete = true;
        full.description_html = Some("<p>Holds tea.</p>".to_string());
        cache.merge_product(full);

        cache.merge_collection_listing(listing("frontpage", &["blue-mug"]));

        assert!(cache.product_is_complete(&handle("blue-mug")));
        assert_eq!(
            cache
                .product(&handle("blue-mug"))
                .and_then(|p| p.description_html),
            Some("<p>Holds tea.</p>".to_string())
        );
    }

    #[test]
    fn test_writes_persist_and_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = StorageCache::load(Arc::clone(&store));
        cache.merge_collection_listing(listing("frontpage", &["teapot"]));
        cache.set_shipping(vec!["GB".to_string()]);

        let reloaded = StorageCache::load(store);
        assert!(reloaded.product(&handle("teapot")).is_some());
        assert!(reloaded.collection(&handle("frontpage")).is_some());
        assert_eq!(reloaded.shipping(), vec!["GB".to_string()]);
    }

    #[test]
    fn test_variant_details_from_cached_product() {
        let cache = StorageCache::load(Arc::new(MemoryStore::new()));
        cache.merge_product(full_product("blue-mug"));

        let details = cache.variant_details(&variant_id("blue-mug"));

        assert_eq!(details, Some(("blue mug".to_string(), gbp(1200))));
        assert_eq!(cache.variant_details(&variant_id("teapot")), None);
    }

    #[test]
    fn test_concurrent_merges_all_reach_storage() {
        let dir = std::env::temp_dir().join(format!("heedless-cache-{}", uuid::Uuid::new_v4()));
        let store: Arc<dyn KeyValueStore> =
            Arc::new(crate::storage::FileStore::open(&dir).unwrap_or_else(|e| panic!("{e}")));
        let cache = Arc::new(StorageCache::load(Arc::clone(&store)));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        cache.merge_product(stub_product(&format!("mug-{worker}-{n}"), "frontpage"));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap_or_else(|_| panic!("worker panicked"));
        }

        let reloaded = StorageCache::load(store);
        for worker in 0..8 {
            for n in 0..25 {
                assert_eq!(
                    reloaded.product_state(&handle(&format!("mug-{worker}-{n}"))),
                    LoadState::Stub
                );
            }
        }

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_malformed_entry_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        assert!(store.set(StorageKey::Products, "[1, 2").is_ok());
        assert!(store.set(StorageKey::Shipping, r#"["GB","FR"]"#).is_ok());

        let cache = StorageCache::load(store);

        assert_eq!(cache.product_state(&handle("teapot")), LoadState::Uncached);
        assert_eq!(cache.shipping().len(), 2);
    }
}
