//! Product route handlers.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, Response},
};
use heedless_core::Handle;
use tracing::instrument;

use crate::bus::Event;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

use super::{region_or_document, region_or_redirect};

/// Display product detail.
#[instrument(skip(state, headers))]
pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Result<Html<String>> {
    let handle = Handle::parse(&handle).map_err(|e| AppError::BadRequest(e.to_string()))?;
    add_breadcrumb("navigation", "Viewed product", Some(&[("handle", handle.as_str())]));
    state.app().dispatch(Event::ProductOpen { handle }).await;

    Ok(region_or_document(&state, &headers, |page| page.product.html.clone()))
}

/// Close the product view and fall back to the collection.
#[instrument(skip(state, headers))]
pub async fn close(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.app().dispatch(Event::ProductClose).await;

    region_or_redirect(&state, &headers, |page| page.home.html.clone())
}
