//! Checkout session route handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use merch_core::{CartItem, CheckoutSessionId, CustomerInfo};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Body of `POST /api/stripe/create-checkout-session`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub cart: Vec<CartItem>,
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    pub id: CheckoutSessionId,
    /// Hosted checkout page, for clients that redirect without Stripe.js.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `POST /api/stripe/create-checkout-session`
///
/// Malformed JSON is a 400 with the `{ "error": ... }` body rather than
/// axum's default plain-text rejection.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let session = state
        .checkout()
        .create_session(&request.cart, &request.customer_info)
        .await?;

    Ok(Json(CreateSessionResponse {
        id: session.id,
        url: session.url,
    }))
}
