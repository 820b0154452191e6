//! Integration tests for the Heedless storefront.
//!
//! [`FakeShopify`] is a GraphQL server on an ephemeral port answering the
//! Storefront API operations the storefront sends, dispatching on
//! `operationName` and counting calls. [`TestContext`] starts the real
//! storefront router against it, with the real HTTP client and file storage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p heedless-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use heedless_storefront::config::StorefrontConfig;
use heedless_storefront::routes;
use heedless_storefront::state::AppState;
use serde_json::{Value, json};

/// Storefront token accepted by config validation.
const TEST_TOKEN: &str = "3f2a9c1b7e";

/// A product known to the fake shop.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub handle: String,
    pub title: String,
    pub price: String,
    pub collections: Vec<String>,
}

impl FakeProduct {
    /// Single-variant product priced in GBP.
    #[must_use]
    pub fn new(handle: &str, title: &str, price: &str) -> Self {
        Self {
            handle: handle.to_string(),
            title: title.to_string(),
            price: price.to_string(),
            collections: Vec::new(),
        }
    }

    /// The product's only variant.
    #[must_use]
    pub fn variant_id(&self) -> String {
        format!("gid://shopify/ProductVariant/{}", self.handle)
    }

    fn money(&self) -> Value {
        json!({ "amount": self.price, "currencyCode": "GBP" })
    }

    fn collection_edges(&self) -> Value {
        let edges: Vec<Value> = self
            .collections
            .iter()
            .map(|handle| json!({ "node": { "handle": handle } }))
            .collect();
        json!({ "edges": edges })
    }

    fn listing_json(&self) -> Value {
        json!({
            "id": format!("gid://shopify/Product/{}", self.handle),
            "handle": self.handle,
            "title": self.title,
            "images": { "edges": [{ "node": {
                "url": format!("https://cdn.shopify.com/s/files/{}.jpg", self.handle),
                "altText": self.title,
            } }] },
            "collections": self.collection_edges(),
            "priceRange": { "minVariantPrice": self.money() },
        })
    }

    fn detail_json(&self) -> Value {
        let mut detail = self.listing_json();
        detail["descriptionHtml"] = json!(format!("<p>All about {}.</p>", self.title));
        detail["variants"] = json!({ "edges": [{ "node": {
            "id": self.variant_id(),
            "title": "Default Title",
            "quantityAvailable": 10,
            "price": self.money(),
        } }] });
        detail
    }
}

#[derive(Debug, Clone, Default)]
struct FakeCheckout {
    email: Option<String>,
    lines: Vec<(String, u64)>,
}

#[derive(Default)]
struct Shop {
    products: HashMap<String, FakeProduct>,
    collections: HashMap<String, (String, Vec<String>)>,
    checkouts: HashMap<String, FakeCheckout>,
    failing: HashSet<String>,
    calls: HashMap<String, usize>,
}

#[derive(Default)]
struct FakeShopInner {
    shop: Mutex<Shop>,
    next_checkout: AtomicU64,
}

/// Fake Shopify Storefront GraphQL endpoint.
#[derive(Clone)]
pub struct FakeShopify {
    addr: SocketAddr,
    inner: Arc<FakeShopInner>,
}

impl FakeShopify {
    /// Start the server on `127.0.0.1:0`.
    pub async fn start() -> Self {
        let inner = Arc::new(FakeShopInner::default());
        let app = Router::new()
            .route("/graphql", post(graphql))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Shopify");
        let addr = listener.local_addr().expect("Fake Shopify has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake Shopify crashed");
        });

        Self { addr, inner }
    }

    fn shop(&self) -> std::sync::MutexGuard<'_, Shop> {
        self.inner.shop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// GraphQL endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }

    /// Add a collection listing `products`, in order.
    pub fn add_collection(&self, handle: &str, title: &str, products: &[FakeProduct]) {
        let mut shop = self.shop();
        for product in products {
            let mut product = product.clone();
            product.collections.push(handle.to_string());
            shop.products.insert(product.handle.clone(), product);
        }
        shop.collections.insert(
            handle.to_string(),
            (
                title.to_string(),
                products.iter().map(|p| p.handle.clone()).collect(),
            ),
        );
    }

    /// Answer `operation` with HTTP 500 until [`FakeShopify::recover`].
    pub fn fail(&self, operation: &str) {
        self.shop().failing.insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.shop().failing.remove(operation);
    }

    /// How many times `operation` was requested.
    #[must_use]
    pub fn calls(&self, operation: &str) -> usize {
        self.shop().calls.get(operation).copied().unwrap_or(0)
    }

    /// Line items of checkout `id`, as `(variant_id, quantity)`.
    #[must_use]
    pub fn checkout_lines(&self, id: &str) -> Vec<(String, u64)> {
        self.shop()
            .checkouts
            .get(id)
            .map(|checkout| checkout.lines.clone())
            .unwrap_or_default()
    }
}

async fn graphql(State(inner): State<Arc<FakeShopInner>>, Json(body): Json<Value>) -> impl IntoResponse {
    let operation = body["operationName"].as_str().unwrap_or_default().to_string();
    let variables = &body["variables"];

    let mut shop = inner.shop.lock().unwrap_or_else(PoisonError::into_inner);
    *shop.calls.entry(operation.clone()).or_default() += 1;

    if shop.failing.contains(&operation) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let data = match operation.as_str() {
        "CollectionByHandle" => {
            let handle = variables["handle"].as_str().unwrap_or_default();
            let first = variables["first"].as_u64().unwrap_or(5);
            let collection = shop.collections.get(handle).map(|(title, handles)| {
                let edges: Vec<Value> = handles
                    .iter()
                    .take(usize::try_from(first).unwrap_or(usize::MAX))
                    .filter_map(|h| shop.products.get(h))
                    .map(|p| json!({ "node": p.listing_json() }))
                    .collect();
                json!({ "handle": handle, "title": title, "products": { "edges": edges } })
            });
            json!({ "collection": collection })
        }
        "ProductByHandle" => {
            let handle = variables["handle"].as_str().unwrap_or_default();
            json!({ "product": shop.products.get(handle).map(FakeProduct::detail_json) })
        }
        "SearchProducts" => {
            let query = variables["query"].as_str().unwrap_or_default().to_lowercase();
            let mut matches: Vec<&FakeProduct> = shop
                .products
                .values()
                .filter(|p| p.title.to_lowercase().contains(&query))
                .collect();
            matches.sort_by(|a, b| a.handle.cmp(&b.handle));
            let edges: Vec<Value> = matches
                .into_iter()
                .map(|p| json!({ "node": p.listing_json() }))
                .collect();
            json!({ "products": { "edges": edges } })
        }
        "ShipsToCountries" => json!({ "shop": { "shipsToCountries": ["GB", "IE"] } }),
        "CreateCheckout" => {
            let n = inner.next_checkout.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("gid://shopify/Checkout/{n}");
            let checkout = FakeCheckout {
                lines: parse_lines(&variables["input"]["lineItems"]),
                ..FakeCheckout::default()
            };
            shop.checkouts.insert(id.clone(), checkout);
            json!({ "checkoutCreate": {
                "checkout": checkout_json(&shop, &id),
                "checkoutUserErrors": [],
            } })
        }
        "CheckoutLineItems" => {
            let id = variables["id"].as_str().unwrap_or_default();
            json!({ "node": checkout_json(&shop, id) })
        }
        "ReplaceLineItems" => {
            let id = variables["checkoutId"].as_str().unwrap_or_default().to_string();
            let lines = parse_lines(&variables["lineItems"]);
            if let Some(checkout) = shop.checkouts.get_mut(&id) {
                checkout.lines = lines;
            }
            json!({ "checkoutLineItemsReplace": {
                "checkout": checkout_json(&shop, &id),
                "userErrors": [],
            } })
        }
        "UpdateCheckoutEmail" => {
            let id = variables["checkoutId"].as_str().unwrap_or_default().to_string();
            let email = variables["email"].as_str().map(String::from);
            if let Some(checkout) = shop.checkouts.get_mut(&id) {
                checkout.email = email;
            }
            json!({ "checkoutEmailUpdateV2": {
                "checkout": checkout_json(&shop, &id),
                "checkoutUserErrors": [],
            } })
        }
        _ => {
            return Json(json!({ "errors": [{ "message": format!("Unknown operation {operation}") }] }))
                .into_response();
        }
    };

    Json(json!({ "data": data })).into_response()
}

fn parse_lines(value: &Value) -> Vec<(String, u64)> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some((
                        item["variantId"].as_str()?.to_string(),
                        item["quantity"].as_u64()?,
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn checkout_json(shop: &Shop, id: &str) -> Value {
    let Some(checkout) = shop.checkouts.get(id) else {
        return Value::Null;
    };
    let n = id.rsplit('/').next().unwrap_or_default();

    let edges: Vec<Value> = checkout
        .lines
        .iter()
        .map(|(variant_id, quantity)| {
            let product = shop.products.values().find(|p| &p.variant_id() == variant_id);
            json!({ "node": {
                "title": product.map(|p| p.title.clone()).unwrap_or_default(),
                "quantity": quantity,
                "variant": {
                    "id": variant_id,
                    "title": "Default Title",
                    "price": product.map(FakeProduct::money),
                },
            } })
        })
        .collect();

    json!({
        "id": id,
        "webUrl": format!("https://heedless.test/checkouts/{n}"),
        "email": checkout.email,
        "lineItems": { "edges": edges },
    })
}

/// A running storefront wired to a [`FakeShopify`].
pub struct TestContext {
    pub shopify: FakeShopify,
    pub state: AppState,
    pub client: reqwest::Client,
    pub base_url: String,
    pub storage_dir: PathBuf,
}

impl TestContext {
    /// Start the storefront against `shopify`, with fresh storage.
    ///
    /// Runs the same startup as the binary: the cart is resumed or created
    /// before the server takes requests.
    pub async fn start(shopify: FakeShopify) -> Self {
        let storage_dir =
            std::env::temp_dir().join(format!("heedless-it-{}", uuid::Uuid::new_v4()));
        Self::start_with_storage(shopify, storage_dir).await
    }

    /// Start against existing storage, as after a restart.
    pub async fn start_with_storage(shopify: FakeShopify, storage_dir: PathBuf) -> Self {
        let vars: HashMap<&str, String> = HashMap::from([
            ("SHOPIFY_STOREFRONT_TOKEN", TEST_TOKEN.to_string()),
            ("SHOPIFY_ENDPOINT", shopify.endpoint()),
            ("HEEDLESS_STORAGE_DIR", storage_dir.display().to_string()),
            ("HEEDLESS_RETRY_ATTEMPTS", "2".to_string()),
            ("HEEDLESS_RETRY_BASE_MS", "1".to_string()),
        ]);
        let config = StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
            .expect("Invalid test configuration");

        let state = AppState::new(config).expect("Failed to create application state");
        state.app().init().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        let app = routes::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Storefront crashed");
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            shopify,
            state,
            client,
            base_url: format!("http://{addr}"),
            storage_dir,
        }
    }

    /// GET `path`, returning status and body.
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, String) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("Request failed");
        let status = response.status();
        (status, response.text().await.expect("Body was not text"))
    }

    /// POST a form to `path` as HTMX would, returning status and body.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> (reqwest::StatusCode, String) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("Request failed");
        let status = response.status();
        (status, response.text().await.expect("Body was not text"))
    }

    /// Raw contents of a storage entry, parsed as JSON.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<Value> {
        let text = std::fs::read_to_string(self.storage_dir.join(format!("{key}.json"))).ok()?;
        serde_json::from_str(&text).ok()
    }
}
