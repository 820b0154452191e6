//! Heedless storefront library.
//!
//! A headless Shopify storefront: the catalog is loaded cache-first from the
//! Storefront API, every view reacts to events on a shared bus, and the cart
//! is a Shopify checkout persisted in local storage. The binary serves it
//! over HTTP with HTMX fragments.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod bus;
pub mod cache;
pub mod cart;
pub mod config;
pub mod error;
pub mod loader;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod shopify;
pub mod state;
pub mod storage;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;
