//! Merch Core - Shared domain types.
//!
//! This crate provides the types shared by the merch service components:
//! - `api` - HTTP service bridging Printful (catalog, fulfillment) and Stripe (payments)
//! - `integration-tests` - In-process end-to-end scenarios
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. Wire formats of the upstream services live in the `api` crate;
//! the types here are the shapes the service itself reasons about.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, minor-unit money, and emails
//! - [`cart`] - Cart items and customer info submitted at checkout
//! - [`fulfillment`] - Fulfillment orders submitted after payment

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod fulfillment;
pub mod types;

pub use cart::{CartError, CartItem, CheckoutCart, CustomerInfo, ValidatedCartItem};
pub use fulfillment::{FulfillmentOrder, OrderItem, Recipient};
pub use types::*;
