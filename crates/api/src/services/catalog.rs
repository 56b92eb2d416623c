//! Product catalog reader.
//!
//! Reshapes Printful sync products into the listing and detail payloads the
//! browser client renders. Detail lookups for the listing are fanned out with
//! a concurrency cap and results keep the upstream order. Successful results
//! are cached with a TTL; failures are never cached.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use merch_core::{MinorUnits, ProductId, SyncVariantId};
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::CatalogConfig;
use crate::printful::{
    FulfillmentProvider, PrintfulError, SyncProductDetail, SyncProductSummary, SyncVariant,
    non_empty,
};

pub const NO_NAME: &str = "No name available";
pub const NO_DESCRIPTION: &str = "No description available";
pub const NO_IMAGE: &str = "No image available";

const LISTINGS_KEY: &str = "products";

/// Entry of the enriched product list.
///
/// `price`, `image` and `variant_id` come from the first variant and are
/// `null` for a product without variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub id: ProductId,
    pub name: String,
    pub thumbnail: String,
    pub price: Option<MinorUnits>,
    pub image: Option<String>,
    pub variant_id: Option<SyncVariantId>,
    pub variants: Vec<VariantView>,
}

/// Single-product detail payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub variants: Vec<VariantView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    pub id: SyncVariantId,
    pub name: String,
    /// `null` when the variant has no usable retail price, so it cannot be
    /// checked out at a made-up amount.
    pub price: Option<MinorUnits>,
    pub image: String,
}

impl VariantView {
    fn new(variant: &SyncVariant, product_thumbnail: Option<&str>) -> Self {
        let price = match variant.retail_price.as_deref() {
            Some(raw) => MinorUnits::from_major_str(raw)
                .inspect_err(|e| {
                    warn!(
                        variant_id = %variant.id,
                        retail_price = %raw,
                        error = %e,
                        "Unparseable retail price, listing variant without a price"
                    );
                })
                .ok(),
            None => {
                warn!(variant_id = %variant.id, "Variant has no retail price");
                None
            }
        };

        Self {
            id: variant.id,
            name: non_empty(variant.name.as_deref())
                .unwrap_or(NO_NAME)
                .to_string(),
            price,
            image: variant
                .preview_url()
                .or(product_thumbnail)
                .unwrap_or(NO_IMAGE)
                .to_string(),
        }
    }
}

impl ProductView {
    fn new(detail: &SyncProductDetail) -> Self {
        let product = &detail.sync_product;
        let thumbnail = non_empty(product.thumbnail_url.as_deref());

        Self {
            id: product.id,
            name: non_empty(product.name.as_deref())
                .unwrap_or(NO_NAME)
                .to_string(),
            description: non_empty(product.description.as_deref())
                .unwrap_or(NO_DESCRIPTION)
                .to_string(),
            thumbnail: thumbnail.unwrap_or(NO_IMAGE).to_string(),
            variants: detail
                .sync_variants
                .iter()
                .map(|v| VariantView::new(v, thumbnail))
                .collect(),
        }
    }
}

impl ProductListing {
    fn new(summary: &SyncProductSummary, detail: &SyncProductDetail) -> Self {
        let thumbnail = non_empty(summary.thumbnail_url.as_deref())
            .or_else(|| non_empty(detail.sync_product.thumbnail_url.as_deref()));

        let variants: Vec<VariantView> = detail
            .sync_variants
            .iter()
            .map(|v| VariantView::new(v, thumbnail))
            .collect();

        let first = variants.first();

        Self {
            id: summary.id,
            name: non_empty(summary.name.as_deref())
                .or_else(|| non_empty(detail.sync_product.name.as_deref()))
                .unwrap_or(NO_NAME)
                .to_string(),
            thumbnail: thumbnail.unwrap_or(NO_IMAGE).to_string(),
            price: first.and_then(|v| v.price),
            image: first.map(|v| v.image.clone()),
            variant_id: first.map(|v| v.id),
            variants,
        }
    }
}

#[derive(Clone)]
enum CacheValue {
    Listings(Arc<Vec<ProductListing>>),
    Product(Arc<ProductView>),
}

/// Read-through view of the provider's catalog.
#[derive(Clone)]
pub struct Catalog {
    provider: Arc<dyn FulfillmentProvider>,
    concurrency: usize,
    cache: Option<Cache<String, CacheValue>>,
}

impl Catalog {
    #[must_use]
    pub fn new(provider: Arc<dyn FulfillmentProvider>, config: &CatalogConfig) -> Self {
        let cache = config.cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build()
        });

        Self {
            provider,
            concurrency: config.concurrency.max(1),
            cache,
        }
    }

    /// Every store product with its variants reshaped.
    ///
    /// # Errors
    ///
    /// Returns the first `PrintfulError` from the list call or any detail
    /// lookup; no partial list is returned.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<ProductListing>>, PrintfulError> {
        if let Some(CacheValue::Listings(listings)) = self.cached(LISTINGS_KEY).await {
            debug!("Cache hit for product list");
            return Ok(listings);
        }

        let summaries = self.provider.list_products().await?;
        let provider = self.provider.as_ref();

        let listings: Vec<ProductListing> = stream::iter(summaries)
            .map(|summary| async move {
                let detail = provider.get_product(summary.id).await?;
                Ok::<_, PrintfulError>(ProductListing::new(&summary, &detail))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let listings = Arc::new(listings);
        self.store(LISTINGS_KEY.to_string(), CacheValue::Listings(Arc::clone(&listings)))
            .await;

        debug!(count = listings.len(), "Built product list");
        Ok(listings)
    }

    /// A single product with its variants reshaped.
    ///
    /// # Errors
    ///
    /// Returns `PrintfulError` if the lookup fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Arc<ProductView>, PrintfulError> {
        let key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let detail = self.provider.get_product(id).await?;
        let product = Arc::new(ProductView::new(&detail));

        self.store(key, CacheValue::Product(Arc::clone(&product)))
            .await;

        Ok(product)
    }

    async fn cached(&self, key: &str) -> Option<CacheValue> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn store(&self, key: String, value: CacheValue) {
        if let Some(cache) = &self.cache {
            cache.insert(key, value).await;
        }
    }
}
