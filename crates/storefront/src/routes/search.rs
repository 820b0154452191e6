//! Search route handler.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
};
use serde::Deserialize;
use tracing::instrument;

use crate::bus::Event;
use crate::state::AppState;

use super::region_or_document;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Run a search; a blank query closes the results.
#[instrument(skip(state, headers))]
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    state.app().dispatch(Event::SearchInput { query: query.q }).await;

    region_or_document(&state, &headers, |page| page.search.html.clone())
}
