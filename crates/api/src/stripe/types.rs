//! Stripe wire types.
//!
//! Outbound requests are form-encoded with Stripe's bracket notation
//! (`line_items[0][price_data][unit_amount]=1999`), so the request type
//! renders itself into key/value pairs instead of deriving `Serialize`.

use std::collections::HashMap;

use merch_core::{CheckoutSessionId, MinorUnits, ProductId, SyncVariantId};
use serde::Deserialize;

/// Event type that triggers order translation.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Product metadata key carrying the catalog product id.
pub const METADATA_PRODUCT_ID: &str = "product_id";

/// Product metadata key carrying the Printful sync variant id.
pub const METADATA_VARIANT_ID: &str = "variant_id";

// =============================================================================
// Requests
// =============================================================================

/// Parameters for `POST /v1/checkout/sessions` in `payment` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub shipping_countries: Vec<String>,
    pub line_items: Vec<CheckoutLineItem>,
}

/// One inline-priced line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub image: Option<String>,
    pub unit_amount: MinorUnits,
    pub quantity: u32,
    pub product_id: ProductId,
    pub variant_id: SyncVariantId,
}

impl CheckoutSessionRequest {
    /// Render the request as form fields.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("billing_address_collection".to_string(), "required".to_string()),
            ("phone_number_collection[enabled]".to_string(), "true".to_string()),
        ];

        for (i, country) in self.shipping_countries.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.clone(),
            ));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            let product = format!("{prefix}[price_data][product_data]");

            form.push((format!("{prefix}[price_data][currency]"), self.currency.clone()));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((format!("{product}[name]"), item.name.clone()));
            if let Some(image) = &item.image {
                form.push((format!("{product}[images][0]"), image.clone()));
            }
            form.push((
                format!("{product}[metadata][{METADATA_PRODUCT_ID}]"),
                item.product_id.to_string(),
            ));
            form.push((
                format!("{product}[metadata][{METADATA_VARIANT_ID}]"),
                item.variant_id.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        form
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Stripe error body (`{"error": {"message": "...", "type": "..."}}`).
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Paginated list object.
#[derive(Debug, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// The part of a created session the client needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSession {
    pub id: CheckoutSessionId,
    #[serde(default)]
    pub url: Option<String>,
}

/// A checkout session as delivered in `checkout.session.completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: Option<CheckoutSessionId>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Pre-2025 API versions put shipping here.
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    /// Newer API versions nest shipping under `collected_information`.
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl CheckoutSession {
    /// Shipping details from whichever location the API version uses.
    #[must_use]
    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.collected_information
            .as_ref()
            .and_then(|info| info.shipping_details.as_ref())
            .or(self.shipping_details.as_ref())
    }

    /// Completed but still `unpaid`, as with delayed payment methods.
    #[must_use]
    pub fn awaiting_payment(&self) -> bool {
        self.payment_status.as_deref() == Some("unpaid")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// An item of `GET /v1/checkout/sessions/{id}/line_items`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub price: Option<Price>,
}

impl LineItem {
    /// Metadata of the expanded price product, if the product was expanded.
    #[must_use]
    pub fn product_metadata(&self) -> Option<&HashMap<String, String>> {
        match self.price.as_ref()?.product.as_ref()? {
            Expandable::Object(product) => Some(&product.metadata),
            Expandable::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(default)]
    pub product: Option<Expandable<Product>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A field Stripe returns as an id unless it was expanded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(T),
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}
