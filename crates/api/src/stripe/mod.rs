//! Stripe API integration.
//!
//! # Architecture
//!
//! - Form-encoded REST over `reqwest`, secret key as the basic-auth user
//! - [`PaymentGateway`] is the seam the checkout and webhook flows use
//! - Webhook deliveries are verified by [`WebhookVerifier`] before parsing
//!
//! # Endpoints used
//!
//! - `POST /v1/checkout/sessions` - create a hosted checkout session
//! - `GET /v1/checkout/sessions/{id}/line_items` - purchased items, with the
//!   price product expanded so its metadata is available

mod client;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use types::*;
pub use webhook::{SIGNATURE_HEADER, WebhookError, WebhookVerifier};

use async_trait::async_trait;
use merch_core::CheckoutSessionId;
use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Rate limited by Stripe.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Hosted checkout and purchase lookup against the payment processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout session and return its id and redirect URL.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, StripeError>;

    /// Every line item of a session, price products expanded.
    async fn list_line_items(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError>;
}
