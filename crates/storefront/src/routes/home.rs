//! Home page route handler.

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::Html,
};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

use super::region_or_document;

/// Display the front-page collection, with `?product=h` opened over it.
#[instrument(skip(state, headers))]
pub async fn home(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Result<Html<String>> {
    state.app().navigate(uri.path(), uri.query()).await?;

    Ok(region_or_document(&state, &headers, |page| {
        if page.product.active {
            page.product.html.clone()
        } else {
            page.home.html.clone()
        }
    }))
}
