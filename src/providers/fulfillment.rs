//! Fulfillment provider client: catalog reads and order submission.
//!
//! Wire contract:
//! - `GET  /store/products`       -> `{"result": [{id, name, thumbnail_url}]}`
//! - `GET  /store/products/{id}`  -> `{"result": {product, variants}}`
//! - `POST /orders`               -> `{"result": {id, status}}`
//!
//! Authentication is a bearer API key on every call.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::providers::{read_json, ProviderError};

pub const DEFAULT_API_URL: &str = "https://api.printful.com";

#[derive(Clone)]
pub struct FulfillmentClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl FulfillmentClient {
    pub fn new(http: Client, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Product summaries in catalog order.
    pub async fn list_products(&self) -> Result<Vec<ProductSummary>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/store/products", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let list: ListResponse = read_json(response).await?;
        Ok(list.result)
    }

    /// Full variant detail for one product.
    pub async fn product_detail(&self, product_id: i64) -> Result<ProductDetail, ProviderError> {
        let response = self
            .http
            .get(format!("{}/store/products/{product_id}", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let detail: DetailResponse = read_json(response).await?;
        Ok(detail.result)
    }

    /// Submit a fulfillment order.
    pub async fn create_order(
        &self,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, ProviderError> {
        let response = self
            .http
            .post(format!("{}/orders", self.api_url))
            .bearer_auth(&self.api_key)
            .json(order)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let created: OrderResponse = read_json(response).await?;
        Ok(created.result)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    result: Vec<ProductSummary>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    result: ProductDetail,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    result: OrderConfirmation,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProductDetail {
    pub product: ProductSummary,
    pub variants: Vec<VariantDetail>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VariantDetail {
    pub id: i64,
    pub name: String,
    pub retail_price: Decimal,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub preview_images: Vec<String>,
}

/// Recipient block of a fulfillment order, derived from the checkout form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRequest {
    pub recipient: Recipient,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "variantId")]
    pub variant_id: i64,
    pub quantity: u32,
}

impl OrderRequest {
    pub fn from_cart(cart: &crate::domain::aggregates::Cart, recipient: Recipient) -> Self {
        Self {
            recipient,
            items: cart
                .lines()
                .iter()
                .map(|line| OrderItem {
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OrderConfirmation {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
}
