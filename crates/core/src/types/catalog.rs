//! Catalog records: products, variants, images and collections.
//!
//! Records arrive in two shapes. A collection listing carries a partial
//! product (title, first image, cheapest price); a product detail request
//! carries everything. Both are folded into the same cached record with
//! [`Product::merge`], and the `complete` flag records which shape has been
//! seen.

use serde::{Deserialize, Serialize};

use super::handle::Handle;
use super::id::{ProductId, VariantId};
use super::price::Price;

// =============================================================================
// Images
// =============================================================================

/// Product or collection image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL on the Shopify CDN.
    pub url: String,
    /// Alt text for accessibility.
    #[serde(default)]
    pub alt_text: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    pub price: Price,
    /// Units in stock, when known.
    #[serde(default)]
    pub inventory: Option<u32>,
}

/// Shopify's title for the only variant of a product without options.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// Cart line title: `"Product - Variant"`, or the bare product title when the
/// variant is the default one.
#[must_use]
pub fn line_title(product_title: &str, variant_title: &str) -> String {
    if variant_title.is_empty() || variant_title == DEFAULT_VARIANT_TITLE {
        product_title.to_string()
    } else {
        format!("{product_title} - {variant_title}")
    }
}

/// A product as held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub handle: Handle,
    pub title: String,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Handles of the collections this product belongs to.
    #[serde(default)]
    pub collections: Vec<Handle>,
    /// Cheapest variant price, as reported by listings and search.
    #[serde(default)]
    pub min_price: Option<Price>,
    /// Set once the full product detail has been fetched.
    #[serde(default)]
    pub complete: bool,
}

impl Product {
    /// Fold `incoming` into this record.
    ///
    /// Scalar fields take the incoming value. List fields are replaced only
    /// when the incoming record carries them. Once complete, the detail-only
    /// fields (description, images, variants) only change from another
    /// complete record, so a listing stub never wipes or trims detail data. Collection membership is unioned in first-seen order and
    /// `complete` never goes back to `false`.
    pub fn merge(&mut self, incoming: Self) {
        let Self {
            id,
            handle: _,
            title,
            description_html,
            images,
            variants,
            collections,
            min_price,
            complete,
        } = incoming;

        self.id = id;
        if !title.is_empty() {
            self.title = title;
        }
        if complete || !self.complete {
            if description_html.is_some() {
                self.description_html = description_html;
            }
            if !images.is_empty() {
                self.images = images;
            }
            if !variants.is_empty() {
                self.variants = variants;
            }
        }
        if min_price.is_some() {
            self.min_price = min_price;
        }
        union_into(&mut self.collections, collections);
        self.complete |= complete;
    }

    /// First image, used for cards and the product hero.
    #[must_use]
    pub fn featured_image(&self) -> Option<&Image> {
        self.images.first()
    }

    /// Price to show before a variant is chosen.
    #[must_use]
    pub fn display_price(&self) -> Option<Price> {
        self.min_price
            .or_else(|| self.variants.first().map(|variant| variant.price))
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|variant| &variant.id == id)
    }
}

// =============================================================================
// Collections
// =============================================================================

/// A collection as held in the cache: its member handles in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub handle: Handle,
    pub title: String,
    #[serde(default)]
    pub product_handles: Vec<Handle>,
}

impl Collection {
    /// Fold `incoming` into this record. Member handles are unioned in
    /// first-seen order.
    pub fn merge(&mut self, incoming: Self) {
        if !incoming.title.is_empty() {
            self.title = incoming.title;
        }
        union_into(&mut self.product_handles, incoming.product_handles);
    }
}

fn union_into(existing: &mut Vec<Handle>, incoming: Vec<Handle>) {
    for handle in incoming {
        if !existing.contains(&handle) {
            existing.push(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::price::CurrencyCode;
    use rust_decimal::Decimal;

    fn handle(s: &str) -> Handle {
        Handle::parse(s).unwrap_or_else(|e| panic!("bad handle {s}: {e}"))
    }

    fn gbp(pence: i64) -> Price {
        Price::new(Decimal::new(pence, 2), CurrencyCode::GBP)
    }

    fn stub() -> Product {
        Product {
            id: ProductId::new("gid://shopify/Product/1"),
            handle: handle("blue-mug"),
            title: "Blue Mug".to_string(),
            description_html: None,
            images: vec![Image {
                url: "https://cdn.shopify.com/mug.jpg".to_string(),
                alt_text: None,
            }],
            variants: Vec::new(),
            collections: vec![handle("frontpage")],
            min_price: Some(gbp(1200)),
            complete: false,
        }
    }

    fn detail() -> Product {
        Product {
            description_html: Some("<p>Holds tea.</p>".to_string()),
            images: Vec::new(),
            variants: vec![Variant {
                id: VariantId::new("gid://shopify/ProductVariant/11"),
                title: "Default Title".to_string(),
                price: gbp(1200),
                inventory: None,
            }],
            collections: vec![handle("kitchen")],
            min_price: None,
            complete: true,
            ..stub()
        }
    }

    #[test]
    fn detail_merge_completes_without_losing_listing_data() {
        let mut product = stub();
        product.merge(detail());

        assert!(product.complete);
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.variants.len(), 1);
        assert_eq!(product.min_price, Some(gbp(1200)));
        assert_eq!(
            product.collections,
            vec![handle("frontpage"), handle("kitchen")]
        );
    }

    #[test]
    fn listing_merge_never_regresses_completeness() {
        let mut product = stub();
        product.merge(detail());
        product.merge(stub());

        assert!(product.complete);
        assert_eq!(product.description_html.as_deref(), Some("<p>Holds tea.</p>"));
        assert_eq!(product.variants.len(), 1);
    }

    #[test]
    fn listing_merge_keeps_detail_gallery() {
        let gallery: Vec<Image> = (1..=4)
            .map(|n| Image {
                url: format!("https://cdn.shopify.com/mug-{n}.jpg"),
                alt_text: None,
            })
            .collect();
        let mut product = Product {
            images: gallery.clone(),
            ..detail()
        };

        product.merge(stub());

        assert!(product.complete);
        assert_eq!(product.images, gallery);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = stub();
        once.merge(detail());

        let mut twice = once.clone();
        twice.merge(detail());

        assert_eq!(once, twice);
    }

    #[test]
    fn collection_merge_unions_in_order() {
        let mut collection = Collection {
            handle: handle("frontpage"),
            title: "Home page".to_string(),
            product_handles: vec![handle("a"), handle("b")],
        };
        let incoming = Collection {
            handle: handle("frontpage"),
            title: String::new(),
            product_handles: vec![handle("b"), handle("c")],
        };

        collection.merge(incoming.clone());
        let after_once = collection.clone();
        collection.merge(incoming);

        assert_eq!(collection.title, "Home page");
        assert_eq!(
            collection.product_handles,
            vec![handle("a"), handle("b"), handle("c")]
        );
        assert_eq!(collection, after_once);
    }

    #[test]
    fn display_price_falls_back_to_first_variant() {
        let mut product = detail();
        product.min_price = None;
        assert_eq!(product.display_price(), Some(gbp(1200)));
    }

    #[test]
    fn line_title_hides_default_variant() {
        assert_eq!(line_title("Blue Mug", DEFAULT_VARIANT_TITLE), "Blue Mug");
        assert_eq!(line_title("Blue Mug", "Large"), "Blue Mug - Large");
    }
}
