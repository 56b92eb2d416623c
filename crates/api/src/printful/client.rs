//! Printful REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use merch_core::{FulfillmentOrder, ProductId};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{Envelope, ErrorEnvelope, OrderReceipt, SyncProductDetail, SyncProductSummary};
use super::{FulfillmentProvider, PrintfulError};
use crate::config::PrintfulConfig;

/// Largest page `GET /store/products` will return.
const PAGE_LIMIT: u64 = 100;

/// Client for the Printful API.
#[derive(Clone)]
pub struct PrintfulClient {
    inner: Arc<PrintfulClientInner>,
}

struct PrintfulClientInner {
    client: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    confirm_orders: bool,
}

impl std::fmt::Debug for PrintfulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintfulClient")
            .field("api_base", &self.inner.api_base)
            .field("api_key", &"[REDACTED]")
            .field("confirm_orders", &self.inner.confirm_orders)
            .finish()
    }
}

impl PrintfulClient {
    /// Create a new Printful API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PrintfulConfig, timeout: Duration) -> Result<Self, PrintfulError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(PrintfulClientInner {
                client,
                api_base: config.api_base.clone(),
                api_key: config.api_key.clone(),
                confirm_orders: config.confirm_orders,
            }),
        })
    }

    /// Send a request and unwrap the `result` envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<Envelope<T>, PrintfulError> {
        let response = request
            .bearer_auth(self.inner.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(PrintfulError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(PrintfulError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or_else(|| body.chars().take(200).collect());

            tracing::error!(
                status = %status,
                resource = %resource,
                message = %message,
                "Printful API returned non-success status"
            );
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                resource = %resource,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Printful response"
            );
            PrintfulError::Parse(e)
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }
}

#[async_trait]
impl FulfillmentProvider for PrintfulClient {
    /// Walks every page of `GET /store/products`.
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<SyncProductSummary>, PrintfulError> {
        let mut products = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let request = self
                .inner
                .client
                .get(self.url("/store/products"))
                .query(&[("offset", offset), ("limit", PAGE_LIMIT)]);

            let page: Envelope<Vec<SyncProductSummary>> =
                self.execute(request, "store products").await?;

            let fetched = page.result.len() as u64;
            products.extend(page.result);
            offset += fetched;

            let total = page.paging.map_or(offset, |p| p.total);
            if fetched == 0 || offset >= total {
                break;
            }
        }

        debug!(count = products.len(), "Fetched Printful store products");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<SyncProductDetail, PrintfulError> {
        let request = self
            .inner
            .client
            .get(self.url(&format!("/store/products/{id}")));

        let envelope: Envelope<SyncProductDetail> =
            self.execute(request, &format!("store product {id}")).await?;

        Ok(envelope.result)
    }

    #[instrument(skip(self, order), fields(items = order.items.len()))]
    async fn create_order(&self, order: &FulfillmentOrder) -> Result<OrderReceipt, PrintfulError> {
        // Without confirm=true Printful keeps the order as a draft
        let request = self
            .inner
            .client
            .post(self.url("/orders"))
            .query(&[("confirm", self.inner.confirm_orders)])
            .json(order);

        let envelope: Envelope<OrderReceipt> = self.execute(request, "orders").await?;

        debug!(order_id = envelope.result.id, "Printful order created");
        Ok(envelope.result)
    }
}
