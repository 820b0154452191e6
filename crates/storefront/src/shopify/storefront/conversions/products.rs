//! Product type conversion functions.

use heedless_core::{Image, Price, Product, Variant};

use crate::shopify::ShopifyError;

use super::super::queries::{ImageNode, ListingProduct, Money, product_by_handle};

pub(super) fn convert_money(money: &Money) -> Result<Price, ShopifyError> {
    Price::parse(&money.amount, money.currency_code.as_deref())
        .map_err(|e| ShopifyError::InvalidData(e.to_string()))
}

pub(super) fn convert_image(image: ImageNode) -> Image {
    Image {
        url: image.url,
        alt_text: image.alt_text.filter(|alt| !alt.is_empty()),
    }
}

// =============================================================================
// product_by_handle conversions
// =============================================================================

/// Convert full product detail. The result is marked complete.
///
/// # Errors
///
/// Returns [`ShopifyError::InvalidData`] if a price is not a decimal.
pub fn convert_product(product: product_by_handle::ProductNode) -> Result<Product, ShopifyError> {
    let variants = product
        .variants
        .into_nodes()
        .into_iter()
        .map(convert_variant)
        .collect::<Result<Vec<_>, _>>()?;

    let min_price = product
        .price_range
        .map(|range| convert_money(&range.min_variant_price))
        .transpose()?;

    Ok(Product {
        id: product.id,
        handle: product.handle,
        title: product.title,
        description_html: product.description_html,
        images: product
            .images
            .into_nodes()
            .into_iter()
            .map(convert_image)
            .collect(),
        variants,
        collections: product
            .collections
            .into_nodes()
            .into_iter()
            .map(|node| node.handle)
            .collect(),
        min_price,
        complete: true,
    })
}

fn convert_variant(variant: product_by_handle::VariantNode) -> Result<Variant, ShopifyError> {
    Ok(Variant {
        id: variant.id,
        title: variant.title,
        price: convert_money(&variant.price)?,
        // Negative availability means oversold; treat as out of stock.
        inventory: variant
            .quantity_available
            .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX)),
    })
}

// =============================================================================
// Listing conversions (collections and search)
// =============================================================================

/// Convert a listed product into a stub (`complete == false`).
///
/// # Errors
///
/// Returns [`ShopifyError::InvalidData`] if the price is not a decimal.
pub fn convert_listing_product(product: ListingProduct) -> Result<Product, ShopifyError> {
    let min_price = product
        .price_range
        .map(|range| convert_money(&range.min_variant_price))
        .transpose()?;

    Ok(Product {
        id: product.id,
        handle: product.handle,
        title: product.title,
        description_html: None,
        images: product
            .images
            .into_nodes()
            .into_iter()
            .map(convert_image)
            .collect(),
        variants: Vec::new(),
        collections: product
            .collections
            .into_nodes()
            .into_iter()
            .map(|node| node.handle)
            .collect(),
        min_price,
        complete: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_node(json: serde_json::Value) -> product_by_handle::ProductNode {
        serde_json::from_value(json).unwrap_or_else(|e| panic!("bad fixture: {e}"))
    }

    #[test]
    fn test_convert_product_flattens_edges() {
        let node = product_node(serde_json::json!({
            "id": "gid://shopify/Product/1",
            "handle": "blue-mug",
            "title": "Blue Mug",
            "descriptionHtml": "<p>Holds tea.</p>",
            "images": { "edges": [{ "node": { "url": "https://cdn/mug.jpg", "altText": "" } }] },
            "variants": { "edges": [{ "node": {
                "id": "gid://shopify/ProductVariant/11",
                "title": "Default Title",
                "quantityAvailable": -2,
                "price": { "amount": "12.0", "currencyCode": "GBP" }
            } }] },
            "collections": { "edges": [{ "node": { "handle": "frontpage" } }] },
            "priceRange": { "minVariantPrice": { "amount": "12.0", "currencyCode": "GBP" } }
        }));

        let product = convert_product(node).unwrap_or_else(|e| panic!("{e}"));

        assert!(product.complete);
        assert_eq!(product.images.first().and_then(|i| i.alt_text.clone()), None);
        assert_eq!(product.variants.first().and_then(|v| v.inventory), Some(0));
        assert_eq!(product.variants.first().map(|v| v.price.display()), Some("£12.00".to_string()));
        assert_eq!(product.collections.first().map(ToString::to_string), Some("frontpage".to_string()));
    }

    #[test]
    fn test_bad_price_is_invalid_data() {
        let node = product_node(serde_json::json!({
            "id": "gid://shopify/Product/1",
            "handle": "blue-mug",
            "title": "Blue Mug",
            "descriptionHtml": null,
            "variants": { "edges": [{ "node": {
                "id": "v", "title": "t", "quantityAvailable": null,
                "price": { "amount": "free", "currencyCode": "GBP" }
            } }] },
            "priceRange": null
        }));

        assert!(matches!(convert_product(node), Err(ShopifyError::InvalidData(_))));
    }
}
