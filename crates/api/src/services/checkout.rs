//! Checkout session initiation.

use std::sync::Arc;

use merch_core::{CartError, CartItem, CheckoutCart, CustomerInfo};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::CheckoutConfig;
use crate::stripe::{
    CheckoutLineItem, CheckoutSessionRequest, CreatedSession, PaymentGateway, StripeError,
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Gateway(#[from] StripeError),
}

/// Build the session request for a validated cart.
///
/// Prices pass through untouched, so the request total always equals
/// [`CheckoutCart::total`].
#[must_use]
pub fn session_request(cart: &CheckoutCart, config: &CheckoutConfig) -> CheckoutSessionRequest {
    CheckoutSessionRequest {
        customer_email: cart.email().to_string(),
        success_url: config.success_url.clone(),
        cancel_url: config.cancel_url.clone(),
        currency: config.currency.clone(),
        shipping_countries: config.shipping_countries.clone(),
        line_items: cart
            .items()
            .iter()
            .map(|item| CheckoutLineItem {
                name: item.name.clone(),
                image: item.image.clone(),
                unit_amount: item.unit_price,
                quantity: item.quantity,
                product_id: item.product_id,
                variant_id: item.variant_id,
            })
            .collect(),
    }
}

/// Starts hosted payment sessions for submitted carts.
#[derive(Clone)]
pub struct Checkout {
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl Checkout {
    #[must_use]
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: CheckoutConfig) -> Self {
        Self { gateway, config }
    }

    /// Validate the cart and create a session for it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Cart` for an invalid cart or email, and
    /// `CheckoutError::Gateway` if Stripe rejects the session.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn create_session(
        &self,
        items: &[CartItem],
        customer: &CustomerInfo,
    ) -> Result<CreatedSession, CheckoutError> {
        let cart = CheckoutCart::new(items, customer)?;
        let request = session_request(&cart, &self.config);

        let session = self.gateway.create_checkout_session(&request).await?;

        info!(
            session_id = %session.id,
            total = %cart.total(),
            "Checkout session created"
        );
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use merch_core::{CheckoutSessionId, MinorUnits, ProductId, SyncVariantId};
    use url::Url;

    use super::*;
    use crate::stripe::MockPaymentGateway;

    fn config() -> CheckoutConfig {
        CheckoutConfig::new(
            &Url::parse("https://shop.example.com").unwrap(),
            "US,CA",
            "usd",
        )
        .unwrap()
    }

    fn cart_item(id: u64, price: i64, quantity: i64) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price,
            thumbnail: Some(format!("https://cdn/{id}.png")),
            variant_id: SyncVariantId::new(id * 10),
            quantity,
        }
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            email: "buyer@example.com".to_string(),
        }
    }

    #[test]
    fn test_session_request_preserves_cart_total() {
        let items = vec![cart_item(1, 1999, 3), cart_item(2, 0, 1), cart_item(3, 4500, 2)];
        let cart = CheckoutCart::new(&items, &customer()).unwrap();
        let request = session_request(&cart, &config());

        let total = request
            .line_items
            .iter()
            .try_fold(MinorUnits::ZERO, |acc, line| {
                line.unit_amount
                    .checked_mul(line.quantity)
                    .and_then(|t| acc.checked_add(t))
            })
            .unwrap();

        assert_eq!(total, cart.total());
        assert_eq!(total, MinorUnits::new(1999 * 3 + 4500 * 2));
    }

    #[test]
    fn test_session_request_options() {
        let cart = CheckoutCart::new(&[cart_item(1, 100, 1)], &customer()).unwrap();
        let request = session_request(&cart, &config());

        assert_eq!(request.customer_email, "buyer@example.com");
        assert_eq!(
            request.success_url,
            "https://shop.example.com/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "https://shop.example.com/cart");
        assert_eq!(request.shipping_countries, vec!["US", "CA"]);

        let line = request.line_items.first().unwrap();
        assert_eq!(line.product_id, ProductId::new(1));
        assert_eq!(line.variant_id, SyncVariantId::new(10));
        assert_eq!(line.image.as_deref(), Some("https://cdn/1.png"));
    }

    #[tokio::test]
    async fn test_create_session_rejects_invalid_cart_without_calling_stripe() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_checkout_session().never();

        let checkout = Checkout::new(Arc::new(gateway), config());

        let err = checkout.create_session(&[], &customer()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Cart(CartError::Empty)));

        let err = checkout
            .create_session(&[cart_item(1, 100, 0)], &customer())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Cart(CartError::InvalidQuantity { .. })));
    }

    #[tokio::test]
    async fn test_create_session_returns_gateway_session() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .withf(|request| request.line_items.len() == 2 && request.currency == "usd")
            .times(1)
            .returning(|_| {
                Ok(CreatedSession {
                    id: CheckoutSessionId::new("cs_test_123"),
                    url: Some("https://checkout.stripe.com/c/pay/cs_test_123".to_string()),
                })
            });

        let checkout = Checkout::new(Arc::new(gateway), config());
        let session = checkout
            .create_session(&[cart_item(1, 100, 1), cart_item(2, 250, 2)], &customer())
            .await
            .unwrap();

        assert_eq!(session.id.as_str(), "cs_test_123");
    }
}
