//! Collection type conversion functions.

use heedless_core::{Collection, Product};
use tracing::warn;

use crate::shopify::types::CollectionListing;

use super::super::queries::collection_by_handle;
use super::products::convert_listing_product;

// =============================================================================
// collection_by_handle conversions
// =============================================================================

/// Convert a collection and its listed products.
///
/// Products with unparseable prices are dropped from the listing rather than
/// failing the whole collection. The collection handle is added to each
/// product's membership so the cache can answer "which collections hold
/// this product" without another request.
pub fn convert_collection_listing(
    collection: collection_by_handle::CollectionNode,
) -> CollectionListing {
    let handle = collection.handle;

    let products: Vec<Product> = collection
        .products
        .into_nodes()
        .into_iter()
        .filter_map(|node| {
            let product_handle = node.handle.clone();
            match convert_listing_product(node) {
                Ok(mut product) => {
                    if !product.collections.contains(&handle) {
                        product.collections.insert(0, handle.clone());
                    }
                    Some(product)
                }
                Err(e) => {
                    warn!(handle = %product_handle, error = %e, "Dropping unparseable listed product");
                    None
                }
            }
        })
        .collect();

    CollectionListing {
        collection: Collection {
            handle,
            title: collection.title,
            product_handles: products.iter().map(|p| p.handle.clone()).collect(),
        },
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_keeps_order_and_membership() {
        let node: collection_by_handle::CollectionNode =
            serde_json::from_value(serde_json::json!({
                "handle": "frontpage",
                "title": "Home page",
                "products": { "edges": [
                    { "node": { "id": "p2", "handle": "teapot", "title": "Teapot",
                        "priceRange": { "minVariantPrice": { "amount": "30", "currencyCode": "GBP" } } } },
                    { "node": { "id": "p3", "handle": "broken", "title": "Broken",
                        "priceRange": { "minVariantPrice": { "amount": "n/a", "currencyCode": "GBP" } } } },
                    { "node": { "id": "p1", "handle": "blue-mug", "title": "Blue Mug",
                        "collections": { "edges": [{ "node": { "handle": "kitchen" } }] },
                        "priceRange": null } }
                ] }
            }))
            .unwrap_or_else(|e| panic!("bad fixture: {e}"));

        let listing = convert_collection_listing(node);

        let order: Vec<&str> = listing
            .collection
            .product_handles
            .iter()
            .map(heedless_core::Handle::as_str)
            .collect();
        assert_eq!(order, vec!["teapot", "blue-mug"]);
        assert!(listing.products.iter().all(|p| !p.complete));

        let mug = listing.products.get(1).map(|p| &p.collections);
        let names: Option<Vec<&str>> = mug.map(|c| c.iter().map(heedless_core::Handle::as_str).collect());
        assert_eq!(names, Some(vec!["frontpage", "kitchen"]));
    }
}
