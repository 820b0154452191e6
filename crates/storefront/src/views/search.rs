//! Search results dropdown.

use askama::Template;
use heedless_core::Product;

use crate::bus::{Event, EventBus, EventKind};
use crate::shopify::LoadError;

use super::{Page, ProductCardView, render, render_failure, render_skeleton};

/// Placeholder tiles while a search is in flight.
const SEARCH_PLACEHOLDERS: usize = 3;

#[derive(Template)]
#[template(path = "search/results.html")]
struct SearchResultsTemplate<'a> {
    query: &'a str,
    products: Vec<ProductCardView>,
}

#[must_use]
pub fn render_search_results(query: &str, products: &[Product]) -> String {
    render(&SearchResultsTemplate {
        query,
        products: products.iter().map(ProductCardView::from).collect(),
    })
}

#[must_use]
pub fn render_search_loading() -> String {
    render_skeleton("search", SEARCH_PLACEHOLDERS)
}

#[must_use]
pub fn render_search_failed(query: &str, error: &LoadError) -> String {
    render_failure(
        error,
        Some(format!("/search?q={}", urlencoding::encode(query))),
    )
}

pub(super) fn listen(bus: &EventBus, page: &Page) {
    let page = page.clone();
    bus.listen(
        &[
            EventKind::SearchLoading,
            EventKind::SearchResults,
            EventKind::SearchFailed,
            EventKind::SearchClose,
        ],
        move |event, _| {
            page.update(|state| match event {
                Event::SearchLoading { .. } => state.search.show(render_search_loading()),
                Event::SearchResults { query, products } => {
                    state.search.show(render_search_results(query, products));
                }
                Event::SearchFailed { query, error } => {
                    state.search.show(render_search_failed(query, error));
                }
                Event::SearchClose => {
                    state.search.hide();
                    state.search.html.clear();
                }
                _ => {}
            });
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stub_product;

    #[test]
    fn test_loading_shows_three_placeholders() {
        let html = render_search_loading();
        assert_eq!(html.matches("skeleton__item").count(), SEARCH_PLACEHOLDERS);
    }

    #[test]
    fn test_results_then_close() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::SearchResults {
            query: "mug".to_string(),
            products: vec![stub_product("blue-mug", "frontpage")],
        });
        let search = page.snapshot().search;
        assert!(search.active);
        assert!(search.html.contains("js-product-card=\"blue-mug\""));

        bus.emit(&Event::SearchClose);
        assert!(!page.snapshot().search.active);
    }

    #[test]
    fn test_no_results_message() {
        let html = render_search_results("kettle", &[]);
        assert!(html.contains("No products match"));
    }
}
