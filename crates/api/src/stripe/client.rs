//! Stripe REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use merch_core::CheckoutSessionId;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{CheckoutSessionRequest, CreatedSession, ErrorResponse, LineItem, List};
use super::{PaymentGateway, StripeError};
use crate::config::StripeConfig;

/// Largest page the list endpoints return.
const PAGE_LIMIT: &str = "100";

/// Client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StripeError> {
        let response = request
            .basic_auth(self.inner.secret_key.expose_secret(), None::<&str>)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StripeError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("Stripe returned {status}"));

            tracing::error!(
                status = %status,
                message = %message,
                "Stripe API returned non-success status"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Stripe response"
            );
            StripeError::Parse(e)
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, StripeError> {
        let form = request.to_form();

        let session: CreatedSession = self
            .execute(
                self.inner
                    .client
                    .post(self.url("/checkout/sessions"))
                    .form(&form),
            )
            .await?;

        debug!(session_id = %session.id, "Stripe checkout session created");
        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %session))]
    async fn list_line_items(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError> {
        let path = format!("/checkout/sessions/{session}/line_items");
        let mut items: Vec<LineItem> = Vec::new();

        loop {
            let mut query = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("expand[]", "data.price.product".to_string()),
            ];
            if let Some(last) = items.last() {
                query.push(("starting_after", last.id.clone()));
            }

            let page: List<LineItem> = self
                .execute(self.inner.client.get(self.url(&path)).query(&query))
                .await?;

            let fetched = page.data.len();
            items.extend(page.data);

            if !page.has_more || fetched == 0 {
                break;
            }
        }

        debug!(count = items.len(), "Fetched Stripe line items");
        Ok(items)
    }
}
