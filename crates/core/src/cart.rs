//! Cart contents submitted by the browser client at checkout.
//!
//! [`CartItem`] and [`CustomerInfo`] are the wire shapes the client posts.
//! [`CheckoutCart`] is the validated form handed to the payment processor:
//! a non-empty list of items with positive quantities, non-negative prices
//! and a structurally valid receipt email. Prices are never recomputed here,
//! the client-supplied minor-unit price is passed through as is.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{Email, EmailError, MinorUnits, ProductId, SyncVariantId};

/// Reasons a cart is rejected before a payment session is requested.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The cart contains no items.
    #[error("cart is empty")]
    Empty,
    /// An item has a quantity below 1 (or too large to represent).
    #[error("item {index} has invalid quantity {quantity}")]
    InvalidQuantity {
        /// Position of the offending item.
        index: usize,
        /// The submitted quantity.
        quantity: i64,
    },
    /// An item has a negative price.
    #[error("item {index} has negative price {price}")]
    NegativePrice {
        /// Position of the offending item.
        index: usize,
        /// The submitted price.
        price: i64,
    },
    /// An item has a blank display name.
    #[error("item {index} has no name")]
    MissingName {
        /// Position of the offending item.
        index: usize,
    },
    /// The cart total does not fit in minor units.
    #[error("cart total overflows")]
    TotalOverflow,
    /// The customer email is invalid.
    #[error("invalid customer email: {0}")]
    Email(#[from] EmailError),
}

/// A cart line as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog (Printful store product) id.
    pub id: ProductId,
    /// Display name shown on the hosted payment page.
    pub name: String,
    /// Unit price in minor units.
    pub price: i64,
    /// Thumbnail URL shown on the hosted payment page.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Printful sync variant id to fulfill.
    pub variant_id: SyncVariantId,
    /// Number of units.
    pub quantity: i64,
}

/// Customer details posted with the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Receipt email.
    pub email: String,
}

/// A cart line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCartItem {
    /// Catalog product id.
    pub product_id: ProductId,
    /// Printful sync variant id.
    pub variant_id: SyncVariantId,
    /// Display name.
    pub name: String,
    /// Thumbnail URL, kept only when it is an absolute http(s) URL.
    pub image: Option<String>,
    /// Unit price in minor units.
    pub unit_price: MinorUnits,
    /// Number of units, at least 1.
    pub quantity: u32,
}

impl ValidatedCartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Option<MinorUnits> {
        self.unit_price.checked_mul(self.quantity)
    }

    fn validate(index: usize, item: &CartItem) -> Result<Self, CartError> {
        let name = item.name.trim();
        if name.is_empty() {
            return Err(CartError::MissingName { index });
        }

        let price = u64::try_from(item.price).map_err(|_| CartError::NegativePrice {
            index,
            price: item.price,
        })?;

        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity {
                index,
                quantity: item.quantity,
            })?;

        Ok(Self {
            product_id: item.id,
            variant_id: item.variant_id,
            name: name.to_owned(),
            image: item.thumbnail.as_deref().and_then(image_url),
            unit_price: MinorUnits::new(price),
            quantity,
        })
    }
}

/// The thumbnail as an image URL the payment page can load, or `None` for
/// blanks and display placeholders like "No image available".
fn image_url(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .map(String::from)
}

/// A validated cart ready to be turned into a payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCart {
    items: Vec<ValidatedCartItem>,
    email: Email,
    total: MinorUnits,
}

impl CheckoutCart {
    /// Validate the submitted cart and customer info.
    ///
    /// # Errors
    ///
    /// Returns the first [`CartError`] encountered, checking the cart is
    /// non-empty before looking at individual items and the email last.
    pub fn new(items: &[CartItem], customer: &CustomerInfo) -> Result<Self, CartError> {
        if items.is_empty() {
            return Err(CartError::Empty);
        }

        let items = items
            .iter()
            .enumerate()
            .map(|(index, item)| ValidatedCartItem::validate(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        let total = items
            .iter()
            .try_fold(MinorUnits::ZERO, |acc, item| {
                item.line_total().and_then(|line| acc.checked_add(line))
            })
            .ok_or(CartError::TotalOverflow)?;

        let email = Email::parse(&customer.email)?;

        Ok(Self {
            items,
            email,
            total,
        })
    }

    /// The validated items, in submission order.
    #[must_use]
    pub fn items(&self) -> &[ValidatedCartItem] {
        &self.items
    }

    /// The receipt email.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Sum of unit price times quantity over all items.
    #[must_use]
    pub const fn total(&self) -> MinorUnits {
        self.total
    }
}
