//! Core types for Heedless.
//!
//! This module provides type-safe wrappers and records for the storefront domain.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod handle;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart::{Cart, LineItem, merge_line_item};
pub use catalog::{Collection, DEFAULT_VARIANT_TITLE, Image, Product, Variant, line_title};
pub use email::{Email, EmailError};
pub use handle::{Handle, HandleError};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use rust_decimal::Decimal;
pub use status::LoadState;
