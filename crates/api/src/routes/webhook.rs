//! Stripe webhook intake.
//!
//! The body is taken as raw `Bytes`: the signature covers the exact bytes
//! Stripe sent, so nothing may parse or re-encode it before verification.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use tracing::{Span, debug, info, instrument};

use crate::error::Result;
use crate::services::Outcome;
use crate::state::AppState;
use crate::stripe::{CHECKOUT_SESSION_COMPLETED, CheckoutSession, SIGNATURE_HEADER, WebhookError};

/// `POST /webhook`
///
/// Completed checkouts are turned into fulfillment orders before the
/// acknowledgment is sent; a submission failure answers 500 so Stripe
/// redelivers the event.
#[instrument(skip_all, fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader)?;

    let event = state.webhooks().construct_event(&body, signature)?;

    let span = Span::current();
    span.record("event_id", event.id.as_str());
    span.record("event_type", event.event_type.as_str());

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        debug!("Ignoring unhandled event type");
        return Ok("Received");
    }

    let session: CheckoutSession =
        serde_json::from_value(event.data.object).map_err(WebhookError::InvalidPayload)?;

    match state.orders().fulfill(&session).await? {
        Outcome::Submitted(receipt) => {
            info!(order_id = receipt.id, "Checkout fulfilled");
        }
        Outcome::Skipped(reason) => {
            info!(reason = %reason, "Checkout acknowledged without fulfillment");
        }
    }

    Ok("Received")
}
