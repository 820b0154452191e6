//! Heedless Core - Shared domain types.
//!
//! This crate provides the types used by the storefront:
//! - catalog records (products, variants, collections) and their merge rules
//! - the cart and its line items, with totals kept consistent on every change
//! - validated newtypes for handles, Shopify GIDs, quantities, prices and emails
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. Everything here can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers, catalog and cart records, load states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
