//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - Request and response envelopes come from `graphql_client`; the
//!   documents themselves live in [`queries`] as plain strings with variables
//! - Shopify is the source of truth for checkouts; catalog data is mirrored
//!   locally by [`crate::cache`] and never re-fetched once complete
//! - Transient failures (network, 5xx, rate limits) are retried with
//!   exponential backoff before surfacing as a [`ShopifyError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use heedless_storefront::shopify::{StorefrontApi, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config.shopify);
//!
//! let product = client.product_by_handle(&handle).await?;
//! let checkout = client.create_checkout().await?;
//! ```

mod storefront;
pub mod types;

pub use storefront::{StorefrontClient, queries};
pub use types::*;

use std::future::Future;

use heedless_core::{CheckoutId, Email, Handle, LineItem, Product};
use thiserror::Error;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify answered with a non-success status.
    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but carried values the domain types reject.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl ShopifyError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited(_) => true,
            Self::Status(status, _) => *status >= 500,
            _ => false,
        }
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// An error with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Load errors
// =============================================================================

/// Coarse classification of a failed load, used to pick the failure copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The store could not be reached (after retries).
    Network,
    /// The store answered but rejected the request or sent bad data.
    Api,
    /// The requested handle does not exist.
    NotFound,
}

/// A failed load, carried on the event bus to the views.
///
/// Unlike [`ShopifyError`] this is cheap to clone and holds no transport
/// internals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    #[must_use]
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Short, shopper-facing headline for the failure state.
    #[must_use]
    pub const fn headline(&self) -> &'static str {
        match self.kind {
            LoadErrorKind::Network => "We couldn't reach the store. Please try again.",
            LoadErrorKind::Api => "Something went wrong loading this page.",
            LoadErrorKind::NotFound => "We couldn't find what you were looking for.",
        }
    }
}

impl From<&ShopifyError> for LoadError {
    fn from(error: &ShopifyError) -> Self {
        let kind = match error {
            ShopifyError::NotFound(_) => LoadErrorKind::NotFound,
            e if e.is_transient() => LoadErrorKind::Network,
            _ => LoadErrorKind::Api,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<ShopifyError> for LoadError {
    fn from(error: ShopifyError) -> Self {
        Self::from(&error)
    }
}

// =============================================================================
// StorefrontApi
// =============================================================================

/// The remote product store, as seen by the loader, cart and search.
///
/// [`StorefrontClient`] talks to Shopify; tests substitute in-memory fakes.
pub trait StorefrontApi: Send + Sync + 'static {
    /// Create an empty checkout.
    fn create_checkout(&self) -> impl Future<Output = Result<Checkout, ShopifyError>> + Send;

    /// Fetch a checkout with its current line items.
    fn checkout_line_items(
        &self,
        checkout_id: &CheckoutId,
    ) -> impl Future<Output = Result<Checkout, ShopifyError>> + Send;

    /// Replace every line item on a checkout.
    fn replace_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_items: &[LineItem],
    ) -> impl Future<Output = Result<Checkout, ShopifyError>> + Send;

    /// Attach an email address to a checkout.
    fn update_checkout_email(
        &self,
        checkout_id: &CheckoutId,
        email: &Email,
    ) -> impl Future<Output = Result<Checkout, ShopifyError>> + Send;

    /// ISO country codes the shop ships to.
    fn ships_to_countries(&self) -> impl Future<Output = Result<Vec<String>, ShopifyError>> + Send;

    /// A collection and the first `limit` of its products, as stubs.
    fn collection_by_handle(
        &self,
        handle: &Handle,
        limit: u32,
    ) -> impl Future<Output = Result<CollectionListing, ShopifyError>> + Send;

    /// Full product detail.
    fn product_by_handle(
        &self,
        handle: &Handle,
    ) -> impl Future<Output = Result<Product, ShopifyError>> + Send;

    /// Free-text product search, as stubs.
    fn search_products(
        &self,
        query: &str,
        first: u32,
    ) -> impl Future<Output = Result<Vec<Product>, ShopifyError>> + Send;
}
