//! Printful wire types.
//!
//! Only the fields the service reads are modelled. Printful sends empty
//! strings as often as it omits fields, so optional text goes through
//! [`non_empty`] before use.

use merch_core::{ProductId, SyncVariantId};
use serde::Deserialize;

/// Standard Printful response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// Pagination block on list responses.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    pub total: u64,
}

/// Error envelope (`{"code": 404, "result": "...", "error": {...}}`).
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// Best human-readable message in the error body.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.reason.clone()))
            .or_else(|| match &self.result {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                _ => None,
            })
    }
}

/// Entry of `GET /store/products`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncProductSummary {
    pub id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Result of `GET /store/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProduct,
    #[serde(default)]
    pub sync_variants: Vec<SyncVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncProduct {
    pub id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncVariant {
    pub id: SyncVariantId,
    #[serde(default)]
    pub name: Option<String>,
    /// Decimal major-unit string, e.g. `"19.99"`.
    #[serde(default)]
    pub retail_price: Option<String>,
    #[serde(default)]
    pub files: Vec<VariantFile>,
}

impl SyncVariant {
    /// Preview image URL: the `preview` file first, then any file with a preview.
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.kind.as_deref() == Some("preview"))
            .and_then(|f| non_empty(f.preview_url.as_deref()))
            .or_else(|| {
                self.files
                    .iter()
                    .find_map(|f| non_empty(f.preview_url.as_deref()))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantFile {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Result of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderReceipt {
    pub id: u64,
}

/// Treat blank strings as missing.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
