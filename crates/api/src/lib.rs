//! Merch order service library.
//!
//! Reads the Printful catalog, opens Stripe checkout sessions, and turns
//! signed `checkout.session.completed` webhooks into Printful orders. Exposed
//! as a library so the router can be driven in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod printful;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;
