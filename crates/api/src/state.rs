//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::printful::{FulfillmentProvider, PrintfulClient, PrintfulError};
use crate::services::{Catalog, Checkout, Orders};
use crate::stripe::{PaymentGateway, StripeClient, StripeError, WebhookVerifier};

/// Error building the upstream API clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("printful client: {0}")]
    Printful(#[from] PrintfulError),
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; everything inside is read-only apart from
/// the catalog cache, which synchronizes itself.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    catalog: Catalog,
    checkout: Checkout,
    orders: Orders,
    webhooks: WebhookVerifier,
}

impl AppState {
    /// Create state backed by the live Printful and Stripe APIs.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, StateError> {
        let fulfillment = PrintfulClient::new(&config.printful, config.upstream_timeout)?;
        let payments = StripeClient::new(&config.stripe, config.upstream_timeout)?;

        Ok(Self::with_providers(
            config,
            Arc::new(fulfillment),
            Arc::new(payments),
        ))
    }

    /// Create state over arbitrary provider implementations.
    #[must_use]
    pub fn with_providers(
        config: ApiConfig,
        fulfillment: Arc<dyn FulfillmentProvider>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog = Catalog::new(Arc::clone(&fulfillment), &config.catalog);
        let checkout = Checkout::new(Arc::clone(&payments), config.checkout.clone());
        let orders = Orders::new(payments, fulfillment);
        let webhooks = WebhookVerifier::new(
            config.stripe.webhook_secret.clone(),
            config.stripe.webhook_tolerance,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                checkout,
                orders,
                webhooks,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &Orders {
        &self.inner.orders
    }

    #[must_use]
    pub fn webhooks(&self) -> &WebhookVerifier {
        &self.inner.webhooks
    }
}
