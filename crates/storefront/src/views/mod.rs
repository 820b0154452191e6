//! View renderers.
//!
//! Each view is a set of `askama` templates plus a listener that re-renders
//! its [`Region`] of the [`Page`] when the bus reports a change. Renderers
//! are pure: entity in, HTML out. Every region gets a skeleton while data is
//! loading and a visible failure state when loading fails.

mod cart_drawer;
mod checkout_drawer;
mod collection;
mod page;
mod product;
mod search;

use std::sync::LazyLock;

use askama::Template;
use heedless_core::Product;
use regex::Regex;
use tracing::error;

use crate::shopify::LoadError;

pub use cart_drawer::{CartLineView, CartView, render_cart_count, render_cart_drawer};
pub use checkout_drawer::render_checkout_drawer;
pub use collection::{render_collection, render_collection_failed, render_collection_loading};
pub use page::{HistoryEntry, Page, PageState, Region};
pub use product::{Crumb, ProductView, VariantOptionView, render_product, render_product_failed};
pub use search::{render_search_failed, render_search_loading, render_search_results};

/// Image size used for product cards.
pub const CARD_IMAGE_SIZE: &str = "400x400";

/// Image size used on the product page.
pub const DETAIL_IMAGE_SIZE: &str = "800x";

static SIZE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(?:pico|icon|thumb|small|compact|medium|large|grande|original|master|\d+x\d+|\d+x|x\d+)$")
        .expect("Invalid regex")
});

/// Rewrite a Shopify CDN image URL to request `size` (e.g. `400x400`).
///
/// Any existing size suffix is replaced and the query string is kept:
/// `mug_large.jpg?v=1` becomes `mug_400x400.jpg?v=1`. URLs without a file
/// extension are returned unchanged.
#[must_use]
pub fn sized_image_url(url: &str, size: &str) -> String {
    let (path, query) = url
        .split_once('?')
        .map_or((url, None), |(path, query)| (path, Some(query)));
    let (dir, file) = path.split_at(path.rfind('/').map_or(0, |i| i + 1));

    let Some((stem, ext)) = file.rsplit_once('.') else {
        return url.to_string();
    };
    let stem = SIZE_SUFFIX_RE.replace(stem, "");

    let mut sized = format!("{dir}{stem}_{size}.{ext}");
    if let Some(query) = query {
        sized.push('?');
        sized.push_str(query);
    }
    sized
}

/// Render a template, logging (and rendering nothing) on failure.
fn render(template: &impl Template) -> String {
    template.render().unwrap_or_else(|e| {
        error!(error = %e, "Template render failed");
        String::new()
    })
}

// =============================================================================
// Shared view models and partials
// =============================================================================

/// A product tile in a grid or search results.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub handle: String,
    pub title: String,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let image = product.featured_image();
        Self {
            handle: product.handle.to_string(),
            title: product.title.clone(),
            price: product.display_price().map(|price| price.display()),
            image_url: image.map(|img| sized_image_url(&img.url, CARD_IMAGE_SIZE)),
            image_alt: image
                .and_then(|img| img.alt_text.clone())
                .unwrap_or_else(|| product.title.clone()),
        }
    }
}

/// Grey placeholder blocks shown while a region loads.
#[derive(Template)]
#[template(path = "partials/skeleton.html")]
struct SkeletonTemplate<'a> {
    kind: &'a str,
    count: usize,
}

/// Visible failure state with an optional retry link.
#[derive(Template)]
#[template(path = "partials/failure.html")]
struct FailureTemplate<'a> {
    headline: &'a str,
    detail: &'a str,
    retry_url: Option<String>,
}

fn render_skeleton(kind: &str, count: usize) -> String {
    render(&SkeletonTemplate { kind, count })
}

fn render_failure(error: &LoadError, retry_url: Option<String>) -> String {
    render(&FailureTemplate {
        headline: error.headline(),
        detail: &error.message,
        retry_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::LoadErrorKind;

    #[test]
    fn test_sized_image_url_replaces_existing_suffix() {
        assert_eq!(
            sized_image_url("https://cdn.shopify.com/s/files/1/mug_large.jpg?v=1", "400x400"),
            "https://cdn.shopify.com/s/files/1/mug_400x400.jpg?v=1"
        );
        assert_eq!(
            sized_image_url("https://cdn.shopify.com/s/files/1/mug_1024x1024.png", "800x"),
            "https://cdn.shopify.com/s/files/1/mug_800x.png"
        );
    }

    #[test]
    fn test_sized_image_url_appends_when_unsized() {
        assert_eq!(
            sized_image_url("https://cdn.shopify.com/s/files/1/blue-mug.jpg", "x300"),
            "https://cdn.shopify.com/s/files/1/blue-mug_x300.jpg"
        );
        assert_eq!(
            sized_image_url("https://cdn.shopify.com/s/files/1/noext", "400x400"),
            "https://cdn.shopify.com/s/files/1/noext"
        );
    }

    #[test]
    fn test_failure_shows_headline_and_retry() {
        let error = LoadError::new(LoadErrorKind::Network, "HTTP error: timed out");
        let html = render_failure(&error, Some("/products/blue-mug".to_string()));

        assert!(html.contains("We couldn"));
        assert!(html.contains("/products/blue-mug"));
        assert!(html.contains("js-failure"));
    }
}
