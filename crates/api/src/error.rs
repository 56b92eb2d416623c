//! Unified error handling with Sentry integration.
//!
//! `/api/*` handlers answer errors with a JSON `{ "error": ... }` body;
//! the webhook endpoint answers in plain text, which is what Stripe's
//! dashboard shows for failed deliveries. Server errors are captured to
//! Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::printful::PrintfulError;
use crate::services::{CheckoutError, OrderError};
use crate::stripe::{StripeError, WebhookError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog read from Printful failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] PrintfulError),

    /// Cart validation or checkout session creation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Webhook delivery failed verification.
    #[error("Webhook Error: {0}")]
    Webhook(#[from] WebhookError),

    /// A verified order could not be submitted.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(CheckoutError::Cart(_)) | Self::Webhook(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Catalog(_) | Self::Checkout(CheckoutError::Gateway(_)) | Self::Order(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match &self {
            Self::Webhook(_) => (status, self.to_string()).into_response(),
            Self::Order(_) => (status, "Order submission failed").into_response(),
            Self::Catalog(_) => json(status, "Failed to fetch products", None),
            Self::Checkout(CheckoutError::Cart(err)) => json(status, &err.to_string(), None),
            Self::Checkout(CheckoutError::Gateway(err)) => json(
                status,
                "Failed to create checkout session",
                Some(gateway_details(err)),
            ),
            Self::BadRequest(message) => json(status, message, None),
        }
    }
}

fn json(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (status, Json(ErrorBody { error, details })).into_response()
}

/// Stripe's own message for API errors; transport failures stay generic.
fn gateway_details(err: &StripeError) -> String {
    match err {
        StripeError::Api { message, .. } => message.clone(),
        StripeError::RateLimited(_) => "Payment provider is rate limiting requests".to_string(),
        StripeError::Http(_) | StripeError::Parse(_) => {
            "Payment provider unavailable".to_string()
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
