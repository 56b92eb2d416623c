//! Fulfillment orders submitted to the print-on-demand provider.
//!
//! Field names follow the Printful order payload so the types serialize
//! straight into the `POST /orders` request body.

use serde::{Deserialize, Serialize};

use crate::types::SyncVariantId;

/// Shipping recipient of a fulfillment order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
    pub email: String,
    pub phone: String,
}

/// One fulfillment order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Printful sync variant to produce.
    pub sync_variant_id: SyncVariantId,
    /// Number of units.
    pub quantity: u32,
}

/// A request to produce and ship goods for a paid checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentOrder {
    pub recipient: Recipient,
    pub items: Vec<OrderItem>,
}

impl FulfillmentOrder {
    /// Total number of units across all lines.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
