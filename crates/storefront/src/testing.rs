//! Test fixtures and an in-memory [`StorefrontApi`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use heedless_core::{
    CheckoutId, Collection, CurrencyCode, Decimal, Email, Handle, Image, LineItem, Price, Product,
    ProductId, Variant, VariantId,
};

use crate::shopify::{Checkout, CollectionListing, ShopifyError, StorefrontApi};

pub fn handle(s: &str) -> Handle {
    Handle::parse(s).unwrap_or_else(|e| panic!("bad handle {s}: {e}"))
}

pub fn gbp(pence: i64) -> Price {
    Price::new(Decimal::new(pence, 2), CurrencyCode::GBP)
}

pub fn variant_id(h: &str) -> VariantId {
    VariantId::new(format!("gid://shopify/ProductVariant/{h}"))
}

/// A listing-shaped product (`complete == false`).
pub fn stub_product(h: &str, collection: &str) -> Product {
    Product {
        id: ProductId::new(format!("gid://shopify/Product/{h}")),
        handle: handle(h),
        title: h.replace('-', " "),
        description_html: None,
        images: vec![Image {
            url: format!("https://cdn.shopify.com/s/files/{h}.jpg"),
            alt_text: None,
        }],
        variants: Vec::new(),
        collections: vec![handle(collection)],
        min_price: Some(gbp(1200)),
        complete: false,
    }
}

/// A detail-shaped product with one £12.00 variant.
pub fn full_product(h: &str) -> Product {
    Product {
        description_html: Some(format!("<p>All about {h}.</p>")),
        variants: vec![Variant {
            id: variant_id(h),
            title: "Default Title".to_string(),
            price: gbp(1200),
            inventory: Some(10),
        }],
        collections: Vec::new(),
        complete: true,
        ..stub_product(h, "frontpage")
    }
}

pub fn listing(collection: &str, products: &[&str]) -> CollectionListing {
    let products: Vec<Product> = products
        .iter()
        .map(|h| stub_product(h, collection))
        .collect();
    CollectionListing {
        collection: Collection {
            handle: handle(collection),
            title: collection.to_string(),
            product_handles: products.iter().map(|p| p.handle.clone()).collect(),
        },
        products,
    }
}

/// In-memory product store that counts every call.
#[derive(Default)]
pub struct FakeApi {
    products: Mutex<HashMap<Handle, Product>>,
    collections: Mutex<HashMap<Handle, CollectionListing>>,
    failing: Mutex<HashSet<Handle>>,
    checkout: Mutex<Option<Checkout>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    product_delay: Option<Duration>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `product_by_handle` response.
    pub fn with_product_delay(mut self, delay: Duration) -> Self {
        self.product_delay = Some(delay);
        self
    }

    pub fn with_product(self, product: Product) -> Self {
        lock(&self.products).insert(product.handle.clone(), product);
        self
    }

    pub fn with_listing(self, listing: CollectionListing) -> Self {
        lock(&self.collections).insert(listing.collection.handle.clone(), listing);
        self
    }

    /// Make every request for `h` fail with a 500.
    pub fn failing(self, h: &str) -> Self {
        lock(&self.failing).insert(handle(h));
        self
    }

    pub fn recover(&self, h: &str) {
        lock(&self.failing).remove(&handle(h));
    }

    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub fn remote_checkout(&self) -> Option<Checkout> {
        lock(&self.checkout).clone()
    }

    fn record(&self, operation: &'static str) {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
    }

    fn check(&self, h: &Handle) -> Result<(), ShopifyError> {
        if lock(&self.failing).contains(h) {
            return Err(ShopifyError::Status(500, "fake outage".to_string()));
        }
        Ok(())
    }

    fn priced(&self, items: &[LineItem]) -> Vec<LineItem> {
        let products = lock(&self.products);
        items
            .iter()
            .map(|item| {
                let variant = products
                    .values()
                    .flat_map(|p| p.variants.iter().map(move |v| (p, v)))
                    .find(|(_, v)| v.id == item.variant_id);
                LineItem {
                    title: variant.map(|(p, _)| p.title.clone()),
                    price: variant.map(|(_, v)| v.price),
                    ..item.clone()
                }
            })
            .collect()
    }

    fn update_checkout(
        &self,
        checkout_id: &CheckoutId,
        update: impl FnOnce(&mut Checkout),
    ) -> Result<Checkout, ShopifyError> {
        let mut remote = lock(&self.checkout);
        match remote.as_mut() {
            Some(checkout) if &checkout.id == checkout_id => {
                update(checkout);
                Ok(checkout.clone())
            }
            _ => Err(ShopifyError::NotFound(format!("Checkout not found: {checkout_id}"))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StorefrontApi for FakeApi {
    async fn create_checkout(&self) -> Result<Checkout, ShopifyError> {
        self.record("create_checkout");
        let n = self.calls("create_checkout");
        let checkout = Checkout {
            id: CheckoutId::new(format!("gid://shopify/Checkout/{n}")),
            web_url: format!("https://heedless.test/checkouts/{n}"),
            email: None,
            line_items: Vec::new(),
        };
        *lock(&self.checkout) = Some(checkout.clone());
        Ok(checkout)
    }

    async fn checkout_line_items(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError> {
        self.record("checkout_line_items");
        self.update_checkout(checkout_id, |_| {})
    }

    async fn replace_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_items: &[LineItem],
    ) -> Result<Checkout, ShopifyError> {
        self.record("replace_line_items");
        let priced = self.priced(line_items);
        self.update_checkout(checkout_id, |checkout| checkout.line_items = priced)
    }

    async fn update_checkout_email(
        &self,
        checkout_id: &CheckoutId,
        email: &Email,
    ) -> Result<Checkout, ShopifyError> {
        self.record("update_checkout_email");
        self.update_checkout(checkout_id, |checkout| {
            checkout.email = Some(email.to_string());
        })
    }

    async fn ships_to_countries(&self) -> Result<Vec<String>, ShopifyError> {
        self.record("ships_to_countries");
        Ok(vec!["GB".to_string(), "IE".to_string()])
    }

    async fn collection_by_handle(
        &self,
        h: &Handle,
        limit: u32,
    ) -> Result<CollectionListing, ShopifyError> {
        self.record("collection_by_handle");
        self.check(h)?;
        let mut listing = lock(&self.collections)
            .get(h)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {h}")))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        listing.products.truncate(limit);
        listing.collection.product_handles.truncate(limit);
        Ok(listing)
    }

    async fn product_by_handle(&self, h: &Handle) -> Result<Product, ShopifyError> {
        self.record("product_by_handle");
        if let Some(delay) = self.product_delay {
            tokio::time::sleep(delay).await;
        }
        self.check(h)?;
        lock(&self.products)
            .get(h)
            .cloned()
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {h}")))
    }

    async fn search_products(&self, query: &str, first: u32) -> Result<Vec<Product>, ShopifyError> {
        self.record("search_products");
        let needle = query.to_lowercase();
        let mut found: Vec<Product> = lock(&self.products)
            .values()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .map(|p| Product {
                variants: Vec::new(),
                description_html: None,
                complete: false,
                ..p.clone()
            })
            .collect();
        found.sort_by(|a, b| a.handle.cmp(&b.handle));
        found.truncate(usize::try_from(first).unwrap_or(usize::MAX));
        Ok(found)
    }
}
