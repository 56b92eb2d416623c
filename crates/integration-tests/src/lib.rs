//! End-to-end harness for the merch order service.
//!
//! Drives the real router in-process against recording fakes of the
//! Printful and Stripe APIs. Webhook requests are signed with the same
//! secret the app is configured with, so verification runs for real.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p merch-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use merch_api::config::{
    ApiConfig, CatalogConfig, CheckoutConfig, PrintfulConfig, SentryConfig, StripeConfig,
};
use merch_api::printful::{
    FulfillmentProvider, OrderReceipt, PrintfulError, SyncProductDetail, SyncProductSummary,
};
use merch_api::routes;
use merch_api::state::AppState;
use merch_api::stripe::{
    CheckoutSessionRequest, CreatedSession, LineItem, PaymentGateway, SIGNATURE_HEADER,
    StripeError, WebhookVerifier,
};
use merch_core::{CheckoutSessionId, FulfillmentOrder, ProductId};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";
pub const CLIENT_URL: &str = "https://shop.example.com";

/// Config pointing at unreachable upstreams; the fakes answer instead.
#[must_use]
pub fn test_config() -> ApiConfig {
    let client_url = Url::parse(CLIENT_URL).expect("valid client url");

    ApiConfig {
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        checkout: CheckoutConfig::new(&client_url, "US,CA", "usd").expect("valid checkout config"),
        client_url,
        stripe: StripeConfig {
            api_base: "http://stripe.invalid/v1".to_string(),
            secret_key: SecretString::from("sk_test_integration".to_string()),
            webhook_secret: SecretString::from(WEBHOOK_SECRET.to_string()),
            webhook_tolerance: Duration::from_secs(300),
        },
        printful: PrintfulConfig {
            api_base: "http://printful.invalid".to_string(),
            api_key: SecretString::from("pf_integration".to_string()),
            confirm_orders: false,
        },
        catalog: CatalogConfig {
            concurrency: 3,
            cache_ttl: None,
        },
        upstream_timeout: Duration::from_secs(5),
        sentry: SentryConfig::default(),
    }
}

// =============================================================================
// Fakes
// =============================================================================

/// Printful fake: serves a fixed catalog and records submitted orders.
#[derive(Default)]
pub struct FakePrintful {
    products: Vec<(SyncProductSummary, SyncProductDetail)>,
    reject_orders: bool,
    orders: Mutex<Vec<FulfillmentOrder>>,
    detail_calls: AtomicUsize,
}

impl FakePrintful {
    #[must_use]
    pub fn with_product(mut self, summary: SyncProductSummary, detail: SyncProductDetail) -> Self {
        self.products.push((summary, detail));
        self
    }

    #[must_use]
    pub fn rejecting_orders(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    /// Orders submitted so far.
    #[must_use]
    pub fn orders(&self) -> Vec<FulfillmentOrder> {
        self.orders.lock().expect("orders lock").clone()
    }

    #[must_use]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FulfillmentProvider for FakePrintful {
    async fn list_products(&self) -> Result<Vec<SyncProductSummary>, PrintfulError> {
        Ok(self.products.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<SyncProductDetail, PrintfulError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.products
            .iter()
            .find(|(s, _)| s.id == id)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| PrintfulError::NotFound(format!("store product {id}")))
    }

    async fn create_order(&self, order: &FulfillmentOrder) -> Result<OrderReceipt, PrintfulError> {
        if self.reject_orders {
            return Err(PrintfulError::Api {
                status: 400,
                message: "Recipient address is invalid".to_string(),
            });
        }

        let mut orders = self.orders.lock().expect("orders lock");
        orders.push(order.clone());

        Ok(OrderReceipt {
            id: 1000 + orders.len() as u64,
        })
    }
}

/// Stripe fake: records session requests and serves canned line items.
#[derive(Default)]
pub struct FakeStripe {
    line_items: HashMap<String, Vec<LineItem>>,
    sessions: Mutex<Vec<CheckoutSessionRequest>>,
    line_item_calls: AtomicUsize,
}

impl FakeStripe {
    #[must_use]
    pub fn with_line_items(mut self, session_id: &str, items: Vec<LineItem>) -> Self {
        self.line_items.insert(session_id.to_string(), items);
        self
    }

    /// Checkout session requests received so far.
    #[must_use]
    pub fn sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.sessions.lock().expect("sessions lock").clone()
    }

    #[must_use]
    pub fn line_item_calls(&self) -> usize {
        self.line_item_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeStripe {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, StripeError> {
        let mut sessions = self.sessions.lock().expect("sessions lock");
        sessions.push(request.clone());
        let id = format!("cs_test_{}", sessions.len());

        Ok(CreatedSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{id}")),
            id: CheckoutSessionId::new(id),
        })
    }

    async fn list_line_items(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError> {
        self.line_item_calls.fetch_add(1, Ordering::SeqCst);
        self.line_items
            .get(session.as_str())
            .cloned()
            .ok_or_else(|| StripeError::Api {
                status: 404,
                message: format!("No such checkout session: '{session}'"),
            })
    }
}

// =============================================================================
// Harness
// =============================================================================

/// The router wired to fakes the test can inspect afterwards.
pub struct TestApp {
    pub router: Router,
    pub printful: Arc<FakePrintful>,
    pub stripe: Arc<FakeStripe>,
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    #[must_use]
    pub fn new(printful: FakePrintful, stripe: FakeStripe) -> Self {
        let printful = Arc::new(printful);
        let stripe = Arc::new(stripe);

        let state = AppState::with_providers(
            test_config(),
            Arc::clone(&printful) as Arc<dyn FulfillmentProvider>,
            Arc::clone(&stripe) as Arc<dyn PaymentGateway>,
        );

        Self {
            router: routes::app(state),
            printful,
            stripe,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            body: String::from_utf8(bytes.to_vec()).expect("utf-8 body"),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    /// Post a webhook signed with the configured secret.
    pub async fn post_webhook(&self, event: &Value) -> TestResponse {
        let payload = event.to_string();
        let header = sign(payload.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        self.post_raw_webhook(payload.into_bytes(), Some(&header)).await
    }

    pub async fn post_raw_webhook(&self, payload: Vec<u8>, signature: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }

        self.send(builder.body(Body::from(payload)).expect("valid request"))
            .await
    }
}

/// `Stripe-Signature` value for `payload` under `secret` at `timestamp`.
#[must_use]
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    WebhookVerifier::new(
        SecretString::from(secret.to_string()),
        Duration::from_secs(300),
    )
    .signature_header(payload, timestamp)
    .expect("hmac accepts any key length")
}

// =============================================================================
// Fixtures
// =============================================================================

/// A `checkout.session.completed` event with shipping and customer details.
#[must_use]
pub fn completed_session_event(session_id: &str) -> Value {
    json!({
        "id": "evt_test_completed",
        "object": "event",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "mode": "payment",
                "payment_status": "paid",
                "customer_email": "buyer@example.com",
                "customer_details": {
                    "email": "buyer@example.com",
                    "name": "Billing Person",
                    "phone": "+15035550100",
                    "address": {
                        "line1": "1 Billing St",
                        "city": "Portland",
                        "state": "OR",
                        "postal_code": "97201",
                        "country": "US"
                    }
                },
                "collected_information": {
                    "shipping_details": {
                        "name": "Ship Recipient",
                        "address": {
                            "line1": "500 Main St",
                            "line2": null,
                            "city": "Seattle",
                            "state": "WA",
                            "postal_code": "98101",
                            "country": "US"
                        }
                    }
                }
            }
        }
    })
}

/// Any non-checkout event.
#[must_use]
pub fn other_event(event_type: &str) -> Value {
    json!({
        "id": "evt_test_other",
        "object": "event",
        "type": event_type,
        "data": {"object": {"id": "pi_test_1", "object": "payment_intent"}}
    })
}

/// A line item whose price product is expanded, with optional fulfillment metadata.
#[must_use]
pub fn line_item(id: &str, quantity: u32, metadata: Option<(u64, u64)>) -> LineItem {
    let metadata = metadata.map_or_else(
        || json!({}),
        |(product_id, variant_id)| {
            json!({
                "product_id": product_id.to_string(),
                "variant_id": variant_id.to_string()
            })
        },
    );

    serde_json::from_value(json!({
        "id": id,
        "object": "item",
        "quantity": quantity,
        "price": {
            "id": format!("price_{id}"),
            "unit_amount": 2500,
            "product": {
                "id": format!("prod_{id}"),
                "name": "Printed item",
                "metadata": metadata
            }
        }
    }))
    .expect("valid line item")
}
