//! Shopify Storefront API client implementation.
//!
//! Sends `graphql_client` query bodies with `reqwest` 0.13 and retries
//! transient failures with exponential backoff. Nothing is cached here;
//! catalog caching is the storage cache's job.

mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, QueryBody, Response};
use heedless_core::{CheckoutId, Email, Handle, LineItem, Product};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use crate::config::{RetryPolicy, ShopifyStorefrontConfig};
use crate::shopify::types::{Checkout, CollectionListing};
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError, StorefrontApi};

use conversions::{
    convert_checkout, convert_collection_listing, convert_listing_product, convert_product,
    convert_user_errors, line_item_inputs,
};
use queries::{
    CheckoutLineItems, CollectionByHandle, CreateCheckout, ProductByHandle, ReplaceLineItems,
    SearchProducts, ShipsToCountries, UpdateCheckoutEmail, checkout_line_items,
    collection_by_handle, create_checkout, product_by_handle, replace_line_items,
    search_products, ships_to_countries, update_checkout_email,
};

/// Header carrying the Storefront API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest `Retry-After` honoured before giving up on a rate-limited request.
const MAX_RETRY_AFTER_SECS: u64 = 30;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    retry: RetryPolicy,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                endpoint: config.endpoint.clone(),
                access_token: config.storefront_token.clone(),
                retry: config.retry,
            }),
        }
    }

    /// The GraphQL endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Execute a GraphQL operation, retrying transient failures.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);
        let retry = self.inner.retry;
        let mut attempt = 0;

        loop {
            match self.send::<Q>(&request_body).await {
                Ok(data) => return Ok(data),
                Err(error) if error.is_transient() && attempt + 1 < retry.attempts => {
                    let delay = match error {
                        ShopifyError::RateLimited(secs) if secs <= MAX_RETRY_AFTER_SECS => {
                            Duration::from_secs(secs)
                        }
                        ShopifyError::RateLimited(_) => return Err(error),
                        _ => retry.backoff(attempt),
                    };
                    warn!(
                        operation = request_body.operation_name,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Transient Shopify failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Send one request and interpret the response.
    async fn send<Q: GraphQLQuery>(
        &self,
        request_body: &QueryBody<Q::Variables>,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(ACCESS_TOKEN_HEADER, self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(request_body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&response_text, 500),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::Status(
                status.as_u16(),
                truncate(&response_text, 200),
            ));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %truncate(&response_text, 500),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %truncate(&response_text, 500),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn missing(what: &str) -> ShopifyError {
    ShopifyError::GraphQL(vec![GraphQLError::message(format!("{what} missing from response"))])
}

impl StorefrontApi for StorefrontClient {
    // =========================================================================
    // Checkout Methods (never cached - remote state)
    // =========================================================================

    #[instrument(skip(self))]
    async fn create_checkout(&self) -> Result<Checkout, ShopifyError> {
        let variables = create_checkout::Variables {
            input: create_checkout::CheckoutCreateInput::default(),
        };

        let payload = self
            .execute::<CreateCheckout>(variables)
            .await?
            .checkout_create
            .ok_or_else(|| missing("checkoutCreate"))?;
        convert_user_errors(payload.checkout_user_errors)?;

        convert_checkout(payload.checkout.ok_or_else(|| missing("checkout"))?)
    }

    #[instrument(skip(self), fields(checkout_id = %checkout_id))]
    async fn checkout_line_items(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError> {
        let variables = checkout_line_items::Variables {
            id: checkout_id.clone(),
        };

        let node = self
            .execute::<CheckoutLineItems>(variables)
            .await?
            .node
            .ok_or_else(|| ShopifyError::NotFound(format!("Checkout not found: {checkout_id}")))?;

        convert_checkout(node)
    }

    #[instrument(skip(self, line_items), fields(checkout_id = %checkout_id, lines = line_items.len()))]
    async fn replace_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_items: &[LineItem],
    ) -> Result<Checkout, ShopifyError> {
        let variables = replace_line_items::Variables {
            checkout_id: checkout_id.clone(),
            line_items: line_item_inputs(line_items),
        };

        let payload = self
            .execute::<ReplaceLineItems>(variables)
            .await?
            .checkout_line_items_replace
            .ok_or_else(|| missing("checkoutLineItemsReplace"))?;
        convert_user_errors(payload.user_errors)?;

        convert_checkout(payload.checkout.ok_or_else(|| missing("checkout"))?)
    }

    #[instrument(skip(self, email), fields(checkout_id = %checkout_id))]
    async fn update_checkout_email(
        &self,
        checkout_id: &CheckoutId,
        email: &Email,
    ) -> Result<Checkout, ShopifyError> {
        let variables = update_checkout_email::Variables {
            checkout_id: checkout_id.clone(),
            email: email.as_str().to_string(),
        };

        let payload = self
            .execute::<UpdateCheckoutEmail>(variables)
            .await?
            .checkout_email_update
            .ok_or_else(|| missing("checkoutEmailUpdateV2"))?;
        convert_user_errors(payload.checkout_user_errors)?;

        convert_checkout(payload.checkout.ok_or_else(|| missing("checkout"))?)
    }

    #[instrument(skip(self))]
    async fn ships_to_countries(&self) -> Result<Vec<String>, ShopifyError> {
        let data = self
            .execute::<ShipsToCountries>(ships_to_countries::Variables::default())
            .await?;

        Ok(data.shop.ships_to_countries)
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    #[instrument(skip(self), fields(handle = %handle))]
    async fn collection_by_handle(
        &self,
        handle: &Handle,
        limit: u32,
    ) -> Result<CollectionListing, ShopifyError> {
        let variables = collection_by_handle::Variables {
            handle: handle.clone(),
            first: limit,
        };

        let collection = self
            .execute::<CollectionByHandle>(variables)
            .await?
            .collection
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {handle}")))?;

        Ok(convert_collection_listing(collection))
    }

    #[instrument(skip(self), fields(handle = %handle))]
    async fn product_by_handle(&self, handle: &Handle) -> Result<Product, ShopifyError> {
        let variables = product_by_handle::Variables {
            handle: handle.clone(),
        };

        let product = self
            .execute::<ProductByHandle>(variables)
            .await?
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        convert_product(product)
    }

    #[instrument(skip(self))]
    async fn search_products(&self, query: &str, first: u32) -> Result<Vec<Product>, ShopifyError> {
        let variables = search_products::Variables {
            query: query.to_string(),
            first,
        };

        let data = self.execute::<SearchProducts>(variables).await?;

        data.products
            .into_nodes()
            .into_iter()
            .map(convert_listing_product)
            .collect()
    }
}
