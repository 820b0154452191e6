//! Results returned by [`super::StorefrontApi`].
//!
//! Catalog records are returned as `heedless_core` types directly; these are
//! the shapes that have no core counterpart.

use heedless_core::{CheckoutId, Collection, LineItem, Product};

/// The remote checkout as Shopify reports it after a query or mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub id: CheckoutId,
    /// Shopify-hosted checkout page.
    pub web_url: String,
    pub email: Option<String>,
    /// Line items with titles and unit prices filled in.
    pub line_items: Vec<LineItem>,
}

/// A collection together with the stub products it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionListing {
    pub collection: Collection,
    /// Partial products in listing order (`complete == false`).
    pub products: Vec<Product>,
}
