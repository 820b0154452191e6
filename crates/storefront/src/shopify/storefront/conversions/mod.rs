//! Type conversion functions for Shopify Storefront API responses.
//!
//! Nested `edges { node }` shapes are flattened into `heedless_core` records
//! here, so nothing past the client sees the wire format.

pub mod checkout;
pub mod collections;
pub mod products;

pub use checkout::{convert_checkout, convert_user_errors, line_item_inputs};
pub use collections::convert_collection_listing;
pub use products::{convert_listing_product, convert_product};
