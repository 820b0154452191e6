//! Product page.
//!
//! A stub from a collection listing renders straight away with placeholders
//! for the description and variant picker, then the complete record replaces
//! it. Only the most recently opened handle is ever rendered.

use askama::Template;
use heedless_core::{Handle, Product, Variant};

use crate::bus::{Event, EventBus, EventKind};
use crate::shopify::LoadError;

use super::{DETAIL_IMAGE_SIZE, Page, render, render_failure, render_skeleton, sized_image_url};

/// One breadcrumb. The last crumb has no link.
#[derive(Debug, Clone)]
pub struct Crumb {
    pub label: String,
    pub href: Option<String>,
}

/// A variant in the add-to-cart picker.
#[derive(Debug, Clone)]
pub struct VariantOptionView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub available: bool,
}

impl From<&Variant> for VariantOptionView {
    fn from(variant: &Variant) -> Self {
        Self {
            id: variant.id.to_string(),
            title: variant.title.clone(),
            price: variant.price.display(),
            available: variant.inventory != Some(0),
        }
    }
}

/// Product page display data.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub handle: String,
    pub title: String,
    pub description_html: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub price: Option<String>,
    pub variants: Vec<VariantOptionView>,
    pub breadcrumbs: Vec<Crumb>,
    /// Rendered from a stub; detail still on its way.
    pub loading: bool,
}

impl ProductView {
    /// Whether any variant can be added to the cart.
    #[must_use]
    pub fn available(&self) -> bool {
        self.variants.iter().any(|variant| variant.available)
    }
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let image = product.featured_image();

        let mut breadcrumbs = vec![Crumb {
            label: "Home".to_string(),
            href: Some("/".to_string()),
        }];
        if let Some(collection) = product.collections.first() {
            breadcrumbs.push(Crumb {
                label: title_from_handle(collection),
                href: Some(format!("/collections/{collection}")),
            });
        }
        breadcrumbs.push(Crumb {
            label: product.title.clone(),
            href: None,
        });

        Self {
            handle: product.handle.to_string(),
            title: product.title.clone(),
            description_html: product.description_html.clone(),
            image_url: image.map(|img| sized_image_url(&img.url, DETAIL_IMAGE_SIZE)),
            image_alt: image
                .and_then(|img| img.alt_text.clone())
                .unwrap_or_else(|| product.title.clone()),
            price: product.display_price().map(|price| price.display()),
            variants: product.variants.iter().map(VariantOptionView::from).collect(),
            breadcrumbs,
            loading: !product.complete,
        }
    }
}

/// `summer-sale` -> `Summer Sale`.
fn title_from_handle(handle: &Handle) -> String {
    handle
        .as_str()
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Template)]
#[template(path = "product/show.html")]
struct ProductTemplate<'a> {
    product: &'a ProductView,
}

/// Render a product; a stub renders with loading placeholders.
#[must_use]
pub fn render_product(product: &Product) -> String {
    render(&ProductTemplate {
        product: &ProductView::from(product),
    })
}

#[must_use]
pub fn render_product_failed(handle: &Handle, error: &LoadError) -> String {
    render_failure(error, Some(format!("/products/{handle}")))
}

pub(super) fn listen(bus: &EventBus, page: &Page) {
    let page = page.clone();
    bus.listen(
        &[
            EventKind::ProductOpen,
            EventKind::ProductLoading,
            EventKind::ProductReady,
            EventKind::ProductFailed,
            EventKind::ProductClose,
        ],
        move |event, bus| match event {
            Event::ProductOpen { handle } => page.update(|state| {
                state.current_product = Some(handle.clone());
                state.product.show(render_skeleton("product", 1));
                state.home.hide();
            }),
            Event::ProductLoading { handle, stub } => {
                let html = stub
                    .as_ref()
                    .map_or_else(|| render_skeleton("product", 1), render_product);
                show_if_current(&page, handle, html);
            }
            Event::ProductReady { product } => {
                if show_if_current(&page, &product.handle, render_product(product)) {
                    bus.emit(&Event::HistoryPush {
                        title: product.title.clone(),
                        url: format!("/?product={}", product.handle),
                    });
                }
            }
            Event::ProductFailed { handle, error } => {
                show_if_current(&page, handle, render_product_failed(handle, error));
            }
            Event::ProductClose => {
                page.update(|state| {
                    state.current_product = None;
                    state.product.hide();
                    state.product.html.clear();
                    state.home.active = true;
                });
                bus.emit(&Event::HistoryPush {
                    title: "Heedless".to_string(),
                    url: "/".to_string(),
                });
            }
            _ => {}
        },
    );
}

/// Render into the product region unless `handle` has been superseded.
fn show_if_current(page: &Page, handle: &Handle, html: String) -> bool {
    page.update(|state| {
        if state.current_product.as_ref() == Some(handle) {
            state.product.show(html);
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::LoadErrorKind;
    use crate::testing::{full_product, handle, stub_product};

    #[test]
    fn test_stub_renders_placeholders_complete_renders_picker() {
        let stub = render_product(&stub_product("blue-mug", "summer-sale"));
        assert!(stub.contains("js-skeleton=\"description\""));
        assert!(stub.contains("Summer Sale"));
        assert!(!stub.contains("name=\"variant_id\""));

        let full = render_product(&full_product("blue-mug"));
        assert!(full.contains("All about blue-mug."));
        assert!(full.contains("name=\"variant_id\""));
        assert!(full.contains("blue-mug_800x.jpg"));
    }

    #[test]
    fn test_superseded_product_never_renders() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::ProductOpen {
            handle: handle("teapot"),
        });
        bus.emit(&Event::ProductOpen {
            handle: handle("blue-mug"),
        });
        bus.emit(&Event::ProductReady {
            product: full_product("teapot"),
        });

        let state = page.snapshot();
        assert!(!state.product.html.contains("js-product=\"teapot\""));
        assert!(state.history.is_empty());

        bus.emit(&Event::ProductReady {
            product: full_product("blue-mug"),
        });
        let state = page.snapshot();
        assert!(state.product.html.contains("js-product=\"blue-mug\""));
        assert_eq!(state.title(), "blue mug");
    }

    #[test]
    fn test_failure_is_visible_not_loading() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::ProductOpen { handle: handle("x") });
        bus.emit(&Event::ProductFailed {
            handle: handle("x"),
            error: LoadError::new(LoadErrorKind::Api, "Shopify returned 500"),
        });

        let product = page.snapshot().product;
        assert!(product.active);
        assert!(product.html.contains("js-failure"));
        assert!(!product.html.contains("js-skeleton"));
    }

    #[test]
    fn test_close_returns_home() {
        let bus = EventBus::new();
        let page = Page::attach(&bus);

        bus.emit(&Event::ProductOpen {
            handle: handle("teapot"),
        });
        bus.emit(&Event::ProductClose);

        let state = page.snapshot();
        assert!(!state.product.active);
        assert!(state.home.active);
        assert_eq!(state.current_product, None);
    }
}
