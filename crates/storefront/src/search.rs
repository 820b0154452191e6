//! Product search.
//!
//! Results are kept per query for a minute so typing back and forth over the
//! same prefix doesn't re-query Shopify. Found products are also folded into
//! the storage cache as stubs, so opening one renders instantly.

use std::sync::Arc;
use std::time::Duration;

use heedless_core::Product;
use moka::future::Cache;
use tracing::{debug, instrument, warn};

use crate::bus::{Event, EventBus};
use crate::cache::StorageCache;
use crate::shopify::{LoadError, StorefrontApi};

const RESULTS_TTL: Duration = Duration::from_secs(60);

/// Searches the catalog and announces results on the bus.
pub struct SearchService<A> {
    api: Arc<A>,
    cache: Arc<StorageCache>,
    bus: Arc<EventBus>,
    limit: u32,
    results: Cache<String, Vec<Product>>,
}

impl<A: StorefrontApi> SearchService<A> {
    pub fn new(api: Arc<A>, cache: Arc<StorageCache>, bus: Arc<EventBus>, limit: u32) -> Self {
        let results = Cache::builder()
            .max_capacity(256)
            .time_to_live(RESULTS_TTL)
            .build();

        Self {
            api,
            cache,
            bus,
            limit,
            results,
        }
    }

    /// Search for `query`.
    ///
    /// A blank query emits `SearchClose`. Otherwise emits `SearchLoading`,
    /// then `SearchResults` or `SearchFailed`.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] emitted with `SearchFailed`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, LoadError> {
        let query = query.trim();
        if query.is_empty() {
            self.bus.emit(&Event::SearchClose);
            return Ok(Vec::new());
        }

        self.bus.emit(&Event::SearchLoading {
            query: query.to_string(),
        });

        let key = query.to_lowercase();
        let products = if let Some(products) = self.results.get(&key).await {
            debug!(results = products.len(), "Search served from cache");
            products
        } else {
            match self.api.search_products(query, self.limit).await {
                Ok(products) => {
                    for product in &products {
                        self.cache.merge_product(product.clone());
                    }
                    self.results.insert(key, products.clone()).await;
                    products
                }
                Err(e) => {
                    warn!(error = %e, "Search failed");
                    let error = LoadError::from(e);
                    self.bus.emit(&Event::SearchFailed {
                        query: query.to_string(),
                        error: error.clone(),
                    });
                    return Err(error);
                }
            }
        };

        self.bus.emit(&Event::SearchResults {
            query: query.to_string(),
            products: products.clone(),
        });
        Ok(products)
    }
}
