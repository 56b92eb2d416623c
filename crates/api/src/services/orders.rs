//! Translation of completed checkout sessions into fulfillment orders.

use std::sync::Arc;

use merch_core::{FulfillmentOrder, OrderItem, Recipient, SyncVariantId};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::printful::{FulfillmentProvider, OrderReceipt, PrintfulError, non_empty};
use crate::stripe::{
    Address, CheckoutSession, LineItem, METADATA_PRODUCT_ID, METADATA_VARIANT_ID,
    PaymentGateway, StripeError,
};

const DEFAULT_RECIPIENT_NAME: &str = "Customer";
const DEFAULT_COUNTRY_CODE: &str = "US";

/// Why a completed session produced no fulfillment order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("Session has no id")]
    MissingSessionId,

    #[error("Session has neither customer nor shipping details")]
    NoCustomerDetails,

    #[error("No line item carries a fulfillment variant")]
    NoFulfillableItems,
}

/// Failures that should make the payment processor redeliver the event.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Failed to fetch line items: {0}")]
    LineItems(#[source] StripeError),

    #[error("Failed to submit fulfillment order: {0}")]
    Submission(#[source] PrintfulError),
}

/// Result of handling a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Submitted(OrderReceipt),
    Skipped(TranslationError),
}

/// Build the fulfillment order for a completed session.
///
/// Line items without a parseable `variant_id` in their product metadata are
/// dropped.
///
/// # Errors
///
/// Returns `TranslationError` if the session carries no customer or
/// shipping details, or if no line item survives.
pub fn translate_order(
    session: &CheckoutSession,
    line_items: &[LineItem],
) -> Result<FulfillmentOrder, TranslationError> {
    let shipping = session.shipping();
    let customer = session.customer_details.as_ref();

    if shipping.is_none() && customer.is_none() {
        return Err(TranslationError::NoCustomerDetails);
    }

    let items: Vec<OrderItem> = line_items.iter().filter_map(order_item).collect();
    if items.is_empty() {
        return Err(TranslationError::NoFulfillableItems);
    }

    let address = shipping
        .and_then(|s| s.address.as_ref())
        .or_else(|| customer.and_then(|c| c.address.as_ref()));

    let recipient = Recipient {
        name: shipping
            .and_then(|s| non_empty(s.name.as_deref()))
            .or_else(|| customer.and_then(|c| non_empty(c.name.as_deref())))
            .unwrap_or(DEFAULT_RECIPIENT_NAME)
            .to_string(),
        address1: address_field(address, |a| a.line1.as_deref()),
        address2: address_field(address, |a| a.line2.as_deref()),
        city: address_field(address, |a| a.city.as_deref()),
        state_code: address_field(address, |a| a.state.as_deref()),
        country_code: address
            .and_then(|a| non_empty(a.country.as_deref()))
            .unwrap_or(DEFAULT_COUNTRY_CODE)
            .to_string(),
        zip: address_field(address, |a| a.postal_code.as_deref()),
        email: customer
            .and_then(|c| non_empty(c.email.as_deref()))
            .or_else(|| non_empty(session.customer_email.as_deref()))
            .unwrap_or_default()
            .to_string(),
        phone: shipping
            .and_then(|s| non_empty(s.phone.as_deref()))
            .or_else(|| customer.and_then(|c| non_empty(c.phone.as_deref())))
            .unwrap_or_default()
            .to_string(),
    };

    Ok(FulfillmentOrder { recipient, items })
}

fn address_field(address: Option<&Address>, pick: impl Fn(&Address) -> Option<&str>) -> String {
    address
        .and_then(|a| non_empty(pick(a)))
        .unwrap_or_default()
        .to_string()
}

fn order_item(line: &LineItem) -> Option<OrderItem> {
    let metadata = line.product_metadata();
    let product_id = metadata.and_then(|m| m.get(METADATA_PRODUCT_ID));

    let Some(variant_id) = metadata
        .and_then(|m| m.get(METADATA_VARIANT_ID))
        .and_then(|raw| raw.parse::<SyncVariantId>().ok())
    else {
        warn!(
            line_item = %line.id,
            product_id = ?product_id,
            "Line item has no fulfillment variant metadata, skipping"
        );
        return None;
    };

    match line.quantity {
        Some(quantity) if quantity > 0 => Some(OrderItem {
            sync_variant_id: variant_id,
            quantity,
        }),
        _ => {
            warn!(line_item = %line.id, variant_id = %variant_id, "Line item has no quantity, skipping");
            None
        }
    }
}

/// Turns paid sessions into submitted fulfillment orders.
#[derive(Clone)]
pub struct Orders {
    payments: Arc<dyn PaymentGateway>,
    fulfillment: Arc<dyn FulfillmentProvider>,
}

impl Orders {
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentGateway>,
        fulfillment: Arc<dyn FulfillmentProvider>,
    ) -> Self {
        Self {
            payments,
            fulfillment,
        }
    }

    /// Fetch the session's line items, translate, and submit.
    ///
    /// A session that cannot be translated is reported as
    /// [`Outcome::Skipped`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns `OrderError` if the line items cannot be fetched or the
    /// provider rejects the order.
    #[instrument(
        skip_all,
        fields(session_id = ?session.id, payment_status = ?session.payment_status)
    )]
    pub async fn fulfill(&self, session: &CheckoutSession) -> Result<Outcome, OrderError> {
        let Some(session_id) = &session.id else {
            warn!("Completed session has no id, skipping");
            return Ok(Outcome::Skipped(TranslationError::MissingSessionId));
        };

        if session.awaiting_payment() {
            warn!("Fulfilling a completed session whose payment has not settled");
        }

        let line_items = self
            .payments
            .list_line_items(session_id)
            .await
            .map_err(OrderError::LineItems)?;

        let order = match translate_order(session, &line_items) {
            Ok(order) => order,
            Err(reason) => {
                warn!(
                    reason = %reason,
                    line_items = line_items.len(),
                    "Not submitting fulfillment order"
                );
                return Ok(Outcome::Skipped(reason));
            }
        };

        let receipt = self
            .fulfillment
            .create_order(&order)
            .await
            .map_err(OrderError::Submission)?;

        info!(
            order_id = receipt.id,
            items = order.items.len(),
            units = order.total_units(),
            "Fulfillment order submitted"
        );
        Ok(Outcome::Submitted(receipt))
    }
}
