//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The checkout itself lives in local storage, so there is no session.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use heedless_core::{Quantity, VariantId};
use serde::Deserialize;
use tracing::instrument;

use crate::bus::{Drawer, Event};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

use super::{region_or_document, region_or_redirect};

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
}

/// Add item to cart (HTMX).
///
/// Returns the cart count badge with an HTMX trigger so the drawer refreshes.
#[instrument(skip(state))]
pub async fn add(State(state): State<AppState>, Form(form): Form<AddToCartForm>) -> Result<Response> {
    let quantity = Quantity::new(form.quantity.unwrap_or(1))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("variant_id", form.variant_id.as_str())]),
    );

    state
        .app()
        .dispatch(Event::CartAdd {
            variant_id: VariantId::new(form.variant_id),
            quantity,
        })
        .await;

    let count = state.app().page().snapshot().cart_counter.html;
    Ok((AppendHeaders([("HX-Trigger", "cart-updated")]), Html(count)).into_response())
}

/// Open the cart drawer.
#[instrument(skip(state, headers))]
pub async fn drawer(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    state.app().dispatch(Event::DrawerOpen(Drawer::Cart)).await;

    region_or_document(&state, &headers, |page| page.cart_drawer.html.clone())
}

/// Get cart count badge (HTMX).
#[instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> Html<String> {
    Html(state.app().page().snapshot().cart_counter.html)
}

/// Close any open drawer.
#[instrument(skip(state, headers))]
pub async fn close_drawers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.app().dispatch(Event::OverlayClose).await;

    region_or_redirect(&state, &headers, |_| String::new())
}
