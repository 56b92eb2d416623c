//! Catalog and checkout endpoints.

use merch_api::printful::{SyncProduct, SyncProductDetail, SyncProductSummary, SyncVariant, VariantFile};
use merch_core::{MinorUnits, ProductId, SyncVariantId};
use merch_integration_tests::{CLIENT_URL, FakePrintful, FakeStripe, TestApp};
use serde_json::json;

fn tee() -> (SyncProductSummary, SyncProductDetail) {
    (
        SyncProductSummary {
            id: ProductId::new(301),
            name: Some("Logo Tee".to_string()),
            thumbnail_url: Some("https://files.cdn.printful.com/tee.png".to_string()),
        },
        SyncProductDetail {
            sync_product: SyncProduct {
                id: ProductId::new(301),
                name: Some("Logo Tee".to_string()),
                description: Some("Soft cotton tee".to_string()),
                thumbnail_url: Some("https://files.cdn.printful.com/tee.png".to_string()),
            },
            sync_variants: vec![
                SyncVariant {
                    id: SyncVariantId::new(4001),
                    name: Some("Logo Tee / S".to_string()),
                    retail_price: Some("19.99".to_string()),
                    files: vec![VariantFile {
                        kind: Some("preview".to_string()),
                        preview_url: Some("https://files.cdn.printful.com/tee-s.png".to_string()),
                    }],
                },
                SyncVariant {
                    id: SyncVariantId::new(4002),
                    name: Some("Logo Tee / M".to_string()),
                    retail_price: Some("21.50".to_string()),
                    files: vec![],
                },
            ],
        },
    )
}

fn poster() -> (SyncProductSummary, SyncProductDetail) {
    (
        SyncProductSummary {
            id: ProductId::new(302),
            name: None,
            thumbnail_url: None,
        },
        SyncProductDetail {
            sync_product: SyncProduct {
                id: ProductId::new(302),
                name: None,
                description: None,
                thumbnail_url: None,
            },
            sync_variants: vec![SyncVariant {
                id: SyncVariantId::new(5001),
                name: None,
                retail_price: None,
                files: vec![],
            }],
        },
    )
}

fn catalog() -> FakePrintful {
    let (tee_summary, tee_detail) = tee();
    let (poster_summary, poster_detail) = poster();
    FakePrintful::default()
        .with_product(tee_summary, tee_detail)
        .with_product(poster_summary, poster_detail)
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_product_list_keeps_order_and_enriches() {
    let app = TestApp::new(catalog(), FakeStripe::default());

    let response = app.get("/api/products").await;
    assert_eq!(response.status, 200);

    let body = response.json();
    let products = body["products"].as_array().expect("products array");
    assert_eq!(products.len(), 2);

    assert_eq!(products[0]["id"], 301);
    assert_eq!(products[0]["price"], 1999);
    assert_eq!(products[0]["variantId"], 4001);
    assert_eq!(products[0]["image"], "https://files.cdn.printful.com/tee-s.png");
    assert_eq!(
        products[0]["variants"][1]["image"], "https://files.cdn.printful.com/tee.png",
        "variant without preview uses the product thumbnail"
    );

    assert_eq!(products[1]["name"], "No name available");
    assert_eq!(products[1]["thumbnail"], "No image available");
    assert!(products[1]["price"].is_null());

    assert_eq!(app.printful.detail_calls(), 2);
}

#[tokio::test]
async fn test_product_detail_shape() {
    let app = TestApp::new(catalog(), FakeStripe::default());

    let response = app.get("/api/products/302").await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.json(),
        json!({
            "id": 302,
            "name": "No name available",
            "description": "No description available",
            "thumbnail": "No image available",
            "variants": [
                {"id": 5001, "name": "No name available", "price": null, "image": "No image available"}
            ]
        })
    );
}

#[tokio::test]
async fn test_unknown_product_is_server_error() {
    let app = TestApp::new(catalog(), FakeStripe::default());

    let response = app.get("/api/products/999").await;
    assert_eq!(response.status, 500);
    assert!(response.json()["error"].is_string());
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_session_carries_cart() {
    let app = TestApp::new(FakePrintful::default(), FakeStripe::default());

    let response = app
        .post_json(
            "/api/stripe/create-checkout-session",
            &json!({
                "cart": [
                    {"id": 301, "name": "Logo Tee", "price": 1999, "thumbnail": "https://files.cdn.printful.com/tee.png", "variantId": 4001, "quantity": 2},
                    {"id": 302, "name": "Poster", "price": 1500, "variantId": 5001, "quantity": 1}
                ],
                "customerInfo": {"email": "buyer@example.com"}
            }),
        )
        .await;

    assert_eq!(response.status, 200);
    let body = response.json();
    assert_eq!(body["id"], "cs_test_1");
    assert!(body["url"].is_string());

    let sessions = app.stripe.sessions();
    let session = sessions.first().expect("one session request");

    assert_eq!(session.customer_email, "buyer@example.com");
    assert_eq!(
        session.success_url,
        format!("{CLIENT_URL}/success?session_id={{CHECKOUT_SESSION_ID}}")
    );
    assert_eq!(session.cancel_url, format!("{CLIENT_URL}/cart"));

    let total = session
        .line_items
        .iter()
        .map(|line| line.unit_amount.get() * u64::from(line.quantity))
        .sum::<u64>();
    assert_eq!(total, 1999 * 2 + 1500);

    let first = session.line_items.first().expect("first line");
    assert_eq!(first.unit_amount, MinorUnits::new(1999));
    assert_eq!(first.variant_id, SyncVariantId::new(4001));
    assert_eq!(first.product_id, ProductId::new(301));
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let app = TestApp::new(FakePrintful::default(), FakeStripe::default());

    let response = app
        .post_json(
            "/api/stripe/create-checkout-session",
            &json!({"cart": [], "customerInfo": {"email": "buyer@example.com"}}),
        )
        .await;

    assert_eq!(response.status, 400);
    assert!(response.json()["error"].is_string());
    assert!(app.stripe.sessions().is_empty());
}

#[tokio::test]
async fn test_imageless_listing_checks_out_without_image() {
    let app = TestApp::new(catalog(), FakeStripe::default());

    let listing = app.get("/api/products").await.json();
    let poster = &listing["products"][1];
    assert_eq!(poster["thumbnail"], "No image available");

    let response = app
        .post_json(
            "/api/stripe/create-checkout-session",
            &json!({
                "cart": [{
                    "id": poster["id"],
                    "name": "Poster",
                    "price": 1500,
                    "thumbnail": poster["thumbnail"],
                    "variantId": poster["variantId"],
                    "quantity": 1
                }],
                "customerInfo": {"email": "buyer@example.com"}
            }),
        )
        .await;

    assert_eq!(response.status, 200);
    let sessions = app.stripe.sessions();
    let line = sessions
        .first()
        .and_then(|s| s.line_items.first())
        .expect("one line");
    assert_eq!(line.image, None);
}

#[tokio::test]
async fn test_unpriced_listing_cannot_be_checked_out() {
    let app = TestApp::new(catalog(), FakeStripe::default());

    let listing = app.get("/api/products").await.json();
    let poster = &listing["products"][1];
    assert!(poster["price"].is_null());

    let response = app
        .post_json(
            "/api/stripe/create-checkout-session",
            &json!({
                "cart": [{
                    "id": poster["id"],
                    "name": "Poster",
                    "price": poster["price"],
                    "variantId": poster["variantId"],
                    "quantity": 1
                }],
                "customerInfo": {"email": "buyer@example.com"}
            }),
        )
        .await;

    assert_eq!(response.status, 400);
    assert!(app.stripe.sessions().is_empty());
}
