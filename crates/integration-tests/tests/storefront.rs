//! End-to-end storefront tests against a fake Shopify GraphQL server.
//!
//! Run with: cargo test -p heedless-integration-tests

use heedless_integration_tests::{FakeProduct, FakeShopify, TestContext};
use reqwest::StatusCode;

fn blue_mug() -> FakeProduct {
    FakeProduct::new("blue-mug", "Blue Mug", "12.00")
}

fn teapot() -> FakeProduct {
    FakeProduct::new("teapot", "Teapot", "30.00")
}

async fn shop() -> FakeShopify {
    let shopify = FakeShopify::start().await;
    shopify.add_collection("frontpage", "Front Page", &[blue_mug(), teapot()]);
    shopify
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_checkout_is_created_once_and_persisted() {
    let ctx = TestContext::start(shop().await).await;

    let (status, _) = ctx
        .post_form("/cart/add", &[("variant_id", &blue_mug().variant_id())])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.shopify.calls("CreateCheckout"), 1);

    let stored = ctx.stored("cart").expect("cart was not persisted");
    assert_eq!(stored["id"], "gid://shopify/Checkout/1");
    assert_eq!(stored["web_url"], "https://heedless.test/checkouts/1");

    // A restart resumes the stored checkout instead of creating another.
    let restarted =
        TestContext::start_with_storage(ctx.shopify.clone(), ctx.storage_dir.clone()).await;
    assert_eq!(restarted.shopify.calls("CreateCheckout"), 1);

    let (status, body) = restarted.get("/cart/count").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(">1<"), "unexpected count: {body}");
}

#[tokio::test]
async fn test_same_variant_twice_is_one_line() {
    let ctx = TestContext::start(shop().await).await;
    let variant = blue_mug().variant_id();

    ctx.post_form("/cart/add", &[("variant_id", &variant)]).await;
    let (_, count) = ctx
        .post_form("/cart/add", &[("variant_id", &variant), ("quantity", "2")])
        .await;

    assert!(count.contains(">3<"), "unexpected count: {count}");
    assert_eq!(
        ctx.shopify.checkout_lines("gid://shopify/Checkout/1"),
        vec![(variant, 3)]
    );

    let (_, drawer) = ctx.get("/cart/drawer").await;
    assert!(drawer.contains("Your cart (3)"));
    assert!(drawer.contains("£36.00"));
}

#[tokio::test]
async fn test_checkout_redirects_to_shopify() {
    let ctx = TestContext::start(shop().await).await;

    let (status, _) = ctx
        .post_form("/checkout/email", &[("email", "shopper@example.com")])
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = ctx
        .client
        .get(format!("{}/checkout/redirect", ctx.base_url))
        .send()
        .await
        .expect("Request failed");
    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok()),
        Some("https://heedless.test/checkouts/1")
    );

    let stored = ctx.stored("cart").expect("cart was not persisted");
    assert_eq!(stored["email"], "shopper@example.com");
}

#[tokio::test]
async fn test_checkout_redirect_reports_upstream_failure() {
    let shopify = shop().await;
    shopify.fail("CreateCheckout");
    let ctx = TestContext::start(shopify).await;

    let (status, body) = ctx.get("/checkout/redirect").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "External service error");
    assert!(ctx.stored("cart").is_none());

    ctx.shopify.recover("CreateCheckout");
    let response = ctx
        .client
        .get(format!("{}/checkout/redirect", ctx.base_url))
        .send()
        .await
        .expect("Request failed");
    assert!(response.status().is_redirection());
    assert!(ctx.stored("cart").is_some());
}

#[tokio::test]
async fn test_invalid_email_is_bad_request() {
    let ctx = TestContext::start(shop().await).await;

    let (status, _) = ctx.post_form("/checkout/email", &[("email", "nope")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.shopify.calls("UpdateCheckoutEmail"), 0);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_stub_product_is_fetched_once() {
    let ctx = TestContext::start(shop().await).await;

    let (status, home) = ctx.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(home.contains("js-product-card=\"blue-mug\""));
    assert_eq!(ctx.shopify.calls("CollectionByHandle"), 1);
    assert_eq!(ctx.shopify.calls("ProductByHandle"), 0);

    let (_, page) = ctx.get("/products/blue-mug").await;
    assert!(page.contains("All about Blue Mug."));
    assert_eq!(ctx.shopify.calls("ProductByHandle"), 1);

    ctx.get("/products/blue-mug").await;
    ctx.get("/").await;
    assert_eq!(ctx.shopify.calls("ProductByHandle"), 1);
    assert_eq!(ctx.shopify.calls("CollectionByHandle"), 1);
}

#[tokio::test]
async fn test_complete_product_survives_restart_without_fetching() {
    let ctx = TestContext::start(shop().await).await;
    ctx.get("/").await;
    ctx.get("/products/teapot").await;
    assert_eq!(ctx.shopify.calls("ProductByHandle"), 1);

    let restarted =
        TestContext::start_with_storage(ctx.shopify.clone(), ctx.storage_dir.clone()).await;
    let (_, page) = restarted.get("/?product=teapot").await;

    assert!(page.contains("All about Teapot."));
    // Both the listing and the full product come from storage.
    assert_eq!(restarted.shopify.calls("ProductByHandle"), 1);
    assert_eq!(restarted.shopify.calls("CollectionByHandle"), 1);
}

#[tokio::test]
async fn test_server_error_renders_failure_then_recovers() {
    let ctx = TestContext::start(shop().await).await;
    ctx.shopify.fail("ProductByHandle");

    let (status, page) = ctx.get("/products/teapot").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("js-failure"));
    assert!(page.contains("/products/teapot"));
    // Two attempts: the first plus one retry.
    assert_eq!(ctx.shopify.calls("ProductByHandle"), 2);

    ctx.shopify.recover("ProductByHandle");
    let (_, page) = ctx.get("/products/teapot").await;
    assert!(page.contains("All about Teapot."));
    assert!(!page.contains("js-failure"));
}

#[tokio::test]
async fn test_missing_collection_and_unknown_paths() {
    let ctx = TestContext::start(shop().await).await;

    let (status, page) = ctx.get("/collections/winter-sale").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("js-failure"));

    let (status, _) = ctx.get("/collections/Not%20A%20Handle").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.get("/blog/news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Search and health
// ============================================================================

#[tokio::test]
async fn test_search_results_are_cached() {
    let ctx = TestContext::start(shop().await).await;

    let response = ctx
        .client
        .get(format!("{}/search?q=mug", ctx.base_url))
        .header("HX-Request", "true")
        .send()
        .await
        .expect("Request failed");
    let results = response.text().await.expect("Body was not text");

    assert!(results.contains("js-product-card=\"blue-mug\""));
    assert!(!results.contains("js-product-card=\"teapot\""));

    ctx.get("/search?q=mug").await;
    assert_eq!(ctx.shopify.calls("SearchProducts"), 1);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let ctx = TestContext::start(shop().await).await;

    let response = ctx
        .client
        .get(format!("{}/health", ctx.base_url))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
