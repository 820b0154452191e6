//! Persistent key-value storage for the cache and cart.
//!
//! The storefront persists four JSON documents, one per [`StorageKey`]. Values
//! are opaque text to the store; (de)serialization happens in the callers.
//!
//! - [`FileStore`]: one `{key}.json` file per key under a directory
//! - [`MemoryStore`]: in-process map, for tests and ephemeral runs

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// The documents the storefront persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Cached products, keyed by handle.
    Products,
    /// Cached collections, keyed by handle.
    Collections,
    /// The shopper's cart.
    Cart,
    /// Country codes the shop ships to.
    Shipping,
}

impl StorageKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Collections => "collections",
            Self::Cart => "cart",
            Self::Shipping => "shipping",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for {key}: {source}")]
    Io {
        key: StorageKey,
        #[source]
        source: std::io::Error,
    },

    #[error("stored {key} is not valid JSON: {source}")]
    Json {
        key: StorageKey,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous text storage keyed by [`StorageKey`].
///
/// Reads happen once at startup; writes happen after every cache or cart
/// mutation. Implementations must be safe to share across request tasks.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the backing store cannot be read.
    fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Replace the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the backing store cannot be written.
    fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;

    /// Forget the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the backing store cannot be written.
    fn remove(&self, key: StorageKey) -> Result<(), StorageError>;
}

/// Read and decode a JSON document.
///
/// # Errors
///
/// Returns an error if the store fails or the stored text is not valid JSON
/// for `T`.
pub fn get_json<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StorageKey,
) -> Result<Option<T>, StorageError> {
    store
        .get(key)?
        .map(|text| serde_json::from_str(&text).map_err(|source| StorageError::Json { key, source }))
        .transpose()
}

/// Encode and write a JSON document.
///
/// # Errors
///
/// Returns an error if encoding or the store fails.
pub fn set_json<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: StorageKey,
    value: &T,
) -> Result<(), StorageError> {
    let text = serde_json::to_string(value).map_err(|source| StorageError::Json { key, source })?;
    store.set(key, &text)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_json_helpers_roundtrip_and_reject_garbage() {
        let store = MemoryStore::new();
        assert!(matches!(get_json::<Vec<String>>(&store, StorageKey::Shipping), Ok(None)));

        let countries = vec!["GB".to_string(), "IE".to_string()];
        assert!(set_json(&store, StorageKey::Shipping, &countries).is_ok());
        let back: Option<Vec<String>> = get_json(&store, StorageKey::Shipping).unwrap_or_default();
        assert_eq!(back, Some(countries));

        assert!(store.set(StorageKey::Products, "{not json").is_ok());
        let err = get_json::<BTreeMap<String, String>>(&store, StorageKey::Products);
        assert!(matches!(err, Err(StorageError::Json { key: StorageKey::Products, .. })));
    }
}
