//! Collection route handlers.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
};
use heedless_core::Handle;
use tracing::instrument;

use crate::bus::Event;
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::region_or_document;

/// Display a collection grid.
#[instrument(skip(state, headers))]
pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Result<Html<String>> {
    let handle = Handle::parse(&handle).map_err(|e| AppError::BadRequest(e.to_string()))?;
    state.app().dispatch(Event::CollectionOpen { handle }).await;

    Ok(region_or_document(&state, &headers, |page| page.home.html.clone()))
}
