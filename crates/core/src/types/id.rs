//! Newtype IDs for upstream entity references.
//!
//! Printful identifies products and variants with numeric ids, Stripe uses
//! opaque strings. Keeping them apart at the type level stops a catalog
//! product id from ending up where a sync variant id belongs in an order.

use core::convert::Infallible;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a numeric upstream ID wrapper.
///
/// Creates a newtype wrapper around `u64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `get()`
/// - `FromStr` so ids carried as string metadata can be parsed back
///
/// # Example
///
/// ```rust
/// # use merch_core::define_id;
/// define_id!(StoreId);
///
/// let id: StoreId = "42".parse().unwrap();
/// assert_eq!(id.get(), 42);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a u64 value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying u64 value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

// Printful store product id.
define_id!(ProductId);
// Printful sync variant id (what fulfillment orders reference).
define_id!(SyncVariantId);

/// Stripe checkout session identifier (e.g. `cs_test_a1B2...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutSessionId(String);

impl CheckoutSessionId {
    /// Wrap a processor-assigned session id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckoutSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CheckoutSessionId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_metadata_string() {
        let id: SyncVariantId = "4012345678".parse().unwrap();
        assert_eq!(id, SyncVariantId::new(4_012_345_678));

        let padded: ProductId = " 17 ".parse().unwrap();
        assert_eq!(padded.get(), 17);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<SyncVariantId>().is_err());
        assert!("abc".parse::<SyncVariantId>().is_err());
        assert!("-5".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ProductId::new(301)).unwrap();
        assert_eq!(json, "301");
    }

    #[test]
    fn test_session_id_display() {
        let id = CheckoutSessionId::new("cs_test_123");
        assert_eq!(id.to_string(), "cs_test_123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cs_test_123\"");
    }
}
