//! Printful API integration.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`, bearer-token auth
//! - Printful is the source of truth for the catalog; nothing is synced locally
//! - [`FulfillmentProvider`] is the seam handlers depend on, so the catalog
//!   reader and order submission can run against fakes in tests
//!
//! # Endpoints used
//!
//! - `GET /store/products` - paginated list of sync products
//! - `GET /store/products/{id}` - sync product with its sync variants
//! - `POST /orders` - create a fulfillment order for sync variants

mod client;
pub mod types;

pub use client::PrintfulClient;
pub use types::*;

use async_trait::async_trait;
use merch_core::{FulfillmentOrder, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Printful.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Catalog reads and order submission against the print-on-demand provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    /// List every sync product in the store.
    async fn list_products(&self) -> Result<Vec<SyncProductSummary>, PrintfulError>;

    /// Fetch a sync product together with its variants.
    async fn get_product(&self, id: ProductId) -> Result<SyncProductDetail, PrintfulError>;

    /// Submit a fulfillment order.
    async fn create_order(&self, order: &FulfillmentOrder) -> Result<OrderReceipt, PrintfulError>;
}
