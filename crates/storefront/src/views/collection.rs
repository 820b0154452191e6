//! Collection grid (the home page).

use askama::Template;
use heedless_core::{Collection, Handle, Product};

use crate::bus::{Event, EventBus, EventKind};
use crate::shopify::LoadError;

use super::{Page, ProductCardView, render, render_failure, render_skeleton};

const GRID_PLACEHOLDERS: usize = 4;

#[derive(Template)]
#[template(path = "collection/grid.html")]
struct CollectionGridTemplate<'a> {
    handle: &'a str,
    title: &'a str,
    products: Vec<ProductCardView>,
}

/// Render a collection's products in listing order.
#[must_use]
pub fn render_collection(collection: &Collection, products: &[Product]) -> String {
    render(&CollectionGridTemplate {
        handle: collection.handle.as_str(),
        title: &collection.title,
        products: products.iter().map(ProductCardView::from).collect(),
    })
}

#[must_use]
pub fn render_collection_loading() -> String {
    render_skeleton("grid", GRID_PLACEHOLDERS)
}

#[must_use]
pub fn render_collection_failed(handle: &Handle, error: &LoadError) -> String {
    render_failure(error, Some(format!("/collections/{handle}")))
}

pub(super) fn listen(bus: &EventBus, page: &Page) {
    let page = page.clone();
    bus.listen(
        &[
            EventKind::CollectionLoading,
            EventKind::CollectionReady,
            EventKind::CollectionFailed,
        ],
        move |event, _| {
            let html = match event {
                Event::CollectionLoading { .. } => render_collection_loading(),
                Event::CollectionReady {
                    collection,
                    products,
                } => render_collection(collection, products),
                Event::CollectionFailed { handle, error } => render_collection_failed(handle, error),
                _ => return,
            };
            page.update(|state| {
                state.home.html = html;
                state.home.active = state.current_product.is_none();
            });
        },
    );
}
