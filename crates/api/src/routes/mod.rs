//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Liveness banner
//! GET  /health                             - Health check
//!
//! # Catalog
//! GET  /api/products                       - Enriched product list
//! GET  /api/products/{id}                  - Product detail
//!
//! # Checkout
//! POST /api/stripe/create-checkout-session - Start a hosted payment session
//!
//! # Stripe
//! POST /webhook                            - Signed payment events (raw body)
//! ```

pub mod checkout;
pub mod home;
pub mod products;
pub mod webhook;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ApiConfig;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route(
            "/stripe/create-checkout-session",
            post(checkout::create_session),
        )
}

/// Build the route table (without middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(home::health))
        .nest("/api", api_routes())
        .route("/webhook", post(webhook::receive))
}

/// CORS restricted to the configured client origin. Other origins get no
/// `Access-Control-Allow-Origin` header at all.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match HeaderValue::from_str(&config.allowed_origin()) {
        Ok(origin) => layer.allow_origin(AllowOrigin::list([origin])),
        Err(e) => {
            tracing::warn!(error = %e, "Client origin is not a valid header value, CORS disabled");
            layer
        }
    }
}

/// Full application: routes, request IDs, tracing, CORS and state.
///
/// Sentry layers are added by the binary around this router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    routes()
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use merch_core::{CheckoutSessionId, ProductId, SyncVariantId};
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{CatalogConfig, CheckoutConfig, PrintfulConfig, SentryConfig, StripeConfig};
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::printful::{
        MockFulfillmentProvider, PrintfulError, SyncProduct, SyncProductDetail, SyncProductSummary,
        SyncVariant,
    };
    use crate::stripe::{CreatedSession, MockPaymentGateway, StripeError, WebhookVerifier};

    const WEBHOOK_SECRET: &str = "whsec_router_tests";

    fn config() -> ApiConfig {
        let client_url = Url::parse("https://shop.example.com").unwrap();
        ApiConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            checkout: CheckoutConfig::new(&client_url, "US,CA", "usd").unwrap(),
            client_url,
            stripe: StripeConfig {
                api_base: "http://stripe.invalid".to_string(),
                secret_key: SecretString::from("sk_test_router".to_string()),
                webhook_secret: SecretString::from(WEBHOOK_SECRET.to_string()),
                webhook_tolerance: Duration::from_secs(300),
            },
            printful: PrintfulConfig {
                api_base: "http://printful.invalid".to_string(),
                api_key: SecretString::from("pf_router".to_string()),
                confirm_orders: false,
            },
            catalog: CatalogConfig {
                concurrency: 2,
                cache_ttl: None,
            },
            upstream_timeout: Duration::from_secs(5),
            sentry: SentryConfig::default(),
        }
    }

    fn app_with(fulfillment: MockFulfillmentProvider, payments: MockPaymentGateway) -> Router {
        app(AppState::with_providers(
            config(),
            Arc::new(fulfillment),
            Arc::new(payments),
        ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn signed_webhook(payload: &str) -> Request<Body> {
        let verifier = WebhookVerifier::new(
            SecretString::from(WEBHOOK_SECRET.to_string()),
            Duration::from_secs(300),
        );
        let header = verifier
            .signature_header(payload.as_bytes(), chrono::Utc::now().timestamp())
            .unwrap();

        Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header("stripe-signature", header)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_request_id() {
        let response = app_with(MockFulfillmentProvider::new(), MockPaymentGateway::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_list_products() {
        let mut fulfillment = MockFulfillmentProvider::new();
        fulfillment.expect_list_products().returning(|| {
            Ok(vec![SyncProductSummary {
                id: ProductId::new(1),
                name: Some("Tee".to_string()),
                thumbnail_url: None,
            }])
        });
        fulfillment.expect_get_product().returning(|id| {
            Ok(SyncProductDetail {
                sync_product: SyncProduct {
                    id,
                    name: Some("Tee".to_string()),
                    description: None,
                    thumbnail_url: None,
                },
                sync_variants: vec![SyncVariant {
                    id: SyncVariantId::new(11),
                    name: Some("Tee / M".to_string()),
                    retail_price: Some("19.99".to_string()),
                    files: vec![],
                }],
            })
        });

        let response = app_with(fulfillment, MockPaymentGateway::new())
            .oneshot(Request::builder().uri("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["products"][0]["price"], 1999);
        assert_eq!(body["products"][0]["variantId"], 11);
        assert_eq!(body["products"][0]["image"], "No image available");
    }

    #[tokio::test]
    async fn test_product_upstream_failure_is_500() {
        let mut fulfillment = MockFulfillmentProvider::new();
        fulfillment
            .expect_get_product()
            .returning(|id| Err(PrintfulError::NotFound(format!("store product {id}"))));

        let response = app_with(fulfillment, MockPaymentGateway::new())
            .oneshot(Request::builder().uri("/api/products/42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_checkout_returns_session_id() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_create_checkout_session().returning(|_| {
            Ok(CreatedSession {
                id: CheckoutSessionId::new("cs_test_abc"),
                url: None,
            })
        });

        let body = r#"{
            "cart": [{"id": 1, "name": "Tee", "price": 1999, "thumbnail": "https://cdn/t.png", "variantId": 11, "quantity": 2}],
            "customerInfo": {"email": "buyer@example.com"}
        }"#;

        let response = app_with(MockFulfillmentProvider::new(), payments)
            .oneshot(post_json("/api/stripe/create-checkout-session", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"id": "cs_test_abc"})
        );
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_input() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_create_checkout_session().never();
        let app = app_with(MockFulfillmentProvider::new(), payments);

        for body in [
            r#"{"cart": [], "customerInfo": {"email": "buyer@example.com"}}"#,
            r#"{"cart": [{"id": 1, "name": "Tee", "price": 100, "variantId": 11, "quantity": 0}], "customerInfo": {"email": "buyer@example.com"}}"#,
            r#"{"cart": [{"id": 1, "name": "Tee", "price": 100, "variantId": 11, "quantity": 1}], "customerInfo": {"email": "nope"}}"#,
            "not json",
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/stripe/create-checkout-session", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_checkout_gateway_failure_has_details() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_create_checkout_session().returning(|_| {
            Err(StripeError::Api {
                status: 400,
                message: "Not a valid URL".to_string(),
            })
        });

        let body = r#"{"cart": [{"id": 1, "name": "Tee", "price": 100, "variantId": 11, "quantity": 1}], "customerInfo": {"email": "buyer@example.com"}}"#;
        let response = app_with(MockFulfillmentProvider::new(), payments)
            .oneshot(post_json("/api/stripe/create-checkout-session", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to create checkout session");
        assert_eq!(body["details"], "Not a valid URL");
    }

    #[tokio::test]
    async fn test_webhook_requires_signature() {
        let response = app_with(MockFulfillmentProvider::new(), MockPaymentGateway::new())
            .oneshot(post_json("/webhook", r#"{"id":"evt_1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.starts_with("Webhook Error:"));
    }

    #[tokio::test]
    async fn test_webhook_ignores_other_events() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_list_line_items().never();
        let mut fulfillment = MockFulfillmentProvider::new();
        fulfillment.expect_create_order().never();

        let payload = r#"{"id":"evt_2","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let response = app_with(fulfillment, payments)
            .oneshot(signed_webhook(payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Received");
    }

    #[tokio::test]
    async fn test_webhook_submission_failure_is_500() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_list_line_items().returning(|_| {
            Err(StripeError::Api {
                status: 404,
                message: "No such checkout session".to_string(),
            })
        });

        let payload = r#"{"id":"evt_3","type":"checkout.session.completed","data":{"object":{"id":"cs_test_1","customer_details":{"email":"a@b.co"}}}}"#;
        let response = app_with(MockFulfillmentProvider::new(), payments)
            .oneshot(signed_webhook(payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_cors_allows_only_client_origin() {
        let app = app_with(MockFulfillmentProvider::new(), MockPaymentGateway::new());

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/stripe/create-checkout-session")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let allowed = app
            .clone()
            .oneshot(preflight("https://shop.example.com"))
            .await
            .unwrap();
        assert_eq!(
            allowed
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://shop.example.com"
        );

        let denied = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(
            !denied
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
