//! Application state shared across handlers.

use std::sync::Arc;

use crate::app::{App, AppSettings};
use crate::config::StorefrontConfig;
use crate::shopify::StorefrontClient;
use crate::storage::{FileStore, KeyValueStore};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot open storage directory: {0}")]
    Storage(#[from] std::io::Error),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    app: App<StorefrontClient>,
}

impl AppState {
    /// Create state persisting to `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let store = FileStore::open(&config.storage_dir)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Create state over an explicit store.
    #[must_use]
    pub fn with_store(config: StorefrontConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let client = Arc::new(StorefrontClient::new(&config.shopify));
        let app = App::new(client, store, AppSettings::from(&config));

        Self {
            inner: Arc::new(AppStateInner { config, app }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the storefront application.
    #[must_use]
    pub fn app(&self) -> &App<StorefrontClient> {
        &self.inner.app
    }
}
