//! Checkout route handlers.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use heedless_core::Email;
use serde::Deserialize;
use tracing::instrument;

use crate::bus::{Drawer, Event};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::region_or_document;

/// Checkout email form data.
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

/// Open the checkout drawer; loads shipping countries on first open.
#[instrument(skip(state, headers))]
pub async fn show(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    state.app().dispatch(Event::DrawerOpen(Drawer::Checkout)).await;

    region_or_document(&state, &headers, |page| page.checkout_drawer.html.clone())
}

/// Attach the shopper's email to the checkout.
#[instrument(skip(state, form))]
pub async fn email(State(state): State<AppState>, Form(form): Form<EmailForm>) -> Result<Response> {
    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;
    state.app().dispatch(Event::CheckoutSubmit { email }).await;

    let drawer = state.app().page().snapshot().checkout_drawer.html;
    Ok((AppendHeaders([("HX-Trigger", "cart-updated")]), Html(drawer)).into_response())
}

/// Redirect to Shopify checkout, creating the checkout if there is none yet.
#[instrument(skip(state))]
pub async fn redirect(State(state): State<AppState>) -> Result<Redirect> {
    let cart = match state.app().cart().current() {
        Some(cart) => cart,
        None => state.app().cart().create_or_resume().await?,
    };
    Ok(Redirect::to(&cart.web_url))
}
