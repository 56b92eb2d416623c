//! Business logic services.
//!
//! # Services
//!
//! - `catalog` - Printful catalog reshaped for the storefront, with caching
//! - `checkout` - Cart validation and Stripe checkout session creation
//! - `orders` - Completed checkout sessions translated into Printful orders

pub mod catalog;
pub mod checkout;
pub mod orders;

pub use catalog::{Catalog, ProductListing, ProductView, VariantView};
pub use checkout::{Checkout, CheckoutError};
pub use orders::{OrderError, Orders, Outcome, TranslationError, translate_order};
