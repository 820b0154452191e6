//! HTTP route handlers for storefront.
//!
//! Every handler turns the request into an [`Event`](crate::bus::Event) for
//! the app and answers with whatever the views rendered. HTMX requests get
//! the affected region; plain requests get the whole document.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Front-page collection (?product=h opens a product)
//! GET  /collections/{handle}   - Collection grid
//! GET  /products/{handle}      - Product detail
//! POST /products/close         - Close the product view
//!
//! # Cart (HTMX fragments)
//! POST /cart/add               - Add to cart (returns count, triggers cart-updated)
//! GET  /cart/drawer            - Open the cart drawer
//! GET  /cart/count             - Cart count badge
//! POST /drawers/close          - Close whichever drawer is open
//!
//! # Search
//! GET  /search?q=              - Search results dropdown
//!
//! # Checkout
//! GET  /checkout               - Open the checkout drawer
//! POST /checkout/email         - Attach an email to the checkout
//! GET  /checkout/redirect      - Redirect to Shopify checkout
//! ```

pub mod cart;
pub mod checkout;
pub mod collections;
pub mod home;
pub mod products;
pub mod search;

use std::time::Duration;

use axum::{
    Router,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;
use crate::views::PageState;

/// Whether the request came from HTMX.
fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

/// Answer with one region for HTMX, or the whole document otherwise.
fn region_or_document(
    state: &AppState,
    headers: &HeaderMap,
    region: impl FnOnce(&PageState) -> String,
) -> Html<String> {
    let page = state.app().page();
    if is_htmx(headers) {
        Html(region(&page.snapshot()))
    } else {
        Html(page.render_document())
    }
}

/// Answer a state-changing POST: the region for HTMX, a redirect otherwise.
fn region_or_redirect(
    state: &AppState,
    headers: &HeaderMap,
    region: impl FnOnce(&PageState) -> String,
) -> Response {
    if is_htmx(headers) {
        Html(region(&state.app().page().snapshot())).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/close", post(products::close))
        .route("/{handle}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/drawer", get(cart::drawer))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/email", post(checkout::email))
        .route("/redirect", get(checkout::redirect))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .route("/collections/{handle}", get(collections::show))
        .nest("/products", product_routes())
        // Cart
        .nest("/cart", cart_routes())
        .route("/drawers/close", post(cart::close_drawers))
        // Search
        .route("/search", get(search::search))
        // Checkout
        .nest("/checkout", checkout_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check Shopify.
pub async fn health() -> &'static str {
    "ok"
}

/// The full application: routes, health check, request IDs and tracing.
///
/// Sentry layers are added by the binary around this.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
