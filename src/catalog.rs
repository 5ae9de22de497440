//! Catalog aggregation from the fulfillment provider.
//!
//! One-shot, best-effort: a list call followed by a concurrent detail
//! fetch per product. There is no caching, retry, or pagination; the
//! caller owns the result and replaces it wholesale on re-fetch.

use futures::future::try_join_all;
use thiserror::Error;

use crate::domain::aggregates::{Product, Variant};
use crate::domain::value_objects::Money;
use crate::providers::fulfillment::{FulfillmentClient, ProductDetail};
use crate::providers::ProviderError;

/// Opaque catalog fetch failure carrying a human-readable message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(String);

impl From<ProviderError> for FetchError {
    fn from(err: ProviderError) -> Self {
        FetchError(err.to_string())
    }
}

pub struct CatalogAggregator {
    client: FulfillmentClient,
}

impl CatalogAggregator {
    pub fn new(client: FulfillmentClient) -> Self {
        Self { client }
    }

    /// Fetch the denormalized catalog. Detail calls run concurrently and
    /// join before returning; the first failure fails the whole
    /// aggregation and the remaining in-flight calls are dropped. Result
    /// order follows the list call.
    pub async fn fetch_catalog(&self) -> Result<Vec<Product>, FetchError> {
        let summaries = self.client.list_products().await?;
        let details =
            try_join_all(summaries.iter().map(|s| self.client.product_detail(s.id))).await?;
        tracing::debug!(products = details.len(), "assembled catalog");
        Ok(details.into_iter().map(assemble_product).collect())
    }
}

fn assemble_product(detail: ProductDetail) -> Product {
    let variants = detail
        .variants
        .into_iter()
        .map(|v| Variant::new(v.id, v.name, Money::usd(v.retail_price), v.sku, v.preview_images))
        .collect();
    Product::new(
        detail.product.id,
        detail.product.name,
        detail.product.thumbnail_url,
        variants,
    )
}
