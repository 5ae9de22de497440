//! Token payment provider client: create-then-capture orders.
//!
//! Every call first obtains a client-credentials access token. Order
//! creation sends the itemized breakdown together with the aggregate
//! amount; both are derived from the same minor-unit figures so they agree
//! to the cent. Capture responses are checked for an embedded `error`
//! field even when the transport status is 200.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::providers::{format_minor_units, read_json, PaymentLineItem, ProviderError};

pub const SANDBOX_API_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_API_URL: &str = "https://api-m.paypal.com";

#[derive(Clone)]
pub struct TokenPaymentClient {
    http: Client,
    api_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderIntent {
    id: String,
}

impl TokenPaymentClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let token: AccessTokenResponse = read_json(response).await?;
        Ok(token.access_token)
    }

    /// Create an order intent; returns the provider-issued order id.
    pub async fn create_order(
        &self,
        items: &[PaymentLineItem],
        return_url: &str,
        cancel_url: &str,
    ) -> Result<String, ProviderError> {
        let total_minor: i64 = items.iter().map(PaymentLineItem::line_total_minor).sum();
        let body = order_body(items, total_minor, return_url, cancel_url);

        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.api_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let order: OrderIntent = read_json(response).await?;
        Ok(order.id)
    }

    /// Capture payment for a previously created order. Returns the full
    /// provider payload.
    pub async fn capture_order(&self, order_id: &str) -> Result<serde_json::Value, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/v2/checkout/orders/{order_id}/capture", self.api_url))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        read_json(response).await
    }
}

fn order_body(
    items: &[PaymentLineItem],
    total_minor: i64,
    return_url: &str,
    cancel_url: &str,
) -> serde_json::Value {
    json!({
        "intent": "CAPTURE",
        "purchase_units": [{
            "amount": {
                "currency_code": "USD",
                "value": format_minor_units(total_minor),
                "breakdown": {
                    "item_total": {
                        "currency_code": "USD",
                        "value": format_minor_units(total_minor),
                    },
                },
            },
            "items": items.iter().map(|item| json!({
                "name": item.name,
                "description": item.description,
                "unit_amount": {
                    "currency_code": "USD",
                    "value": format_minor_units(item.unit_amount_minor),
                },
                "quantity": item.quantity.to_string(),
            })).collect::<Vec<_>>(),
        }],
        "application_context": {
            "user_action": "PAY_NOW",
            "return_url": return_url,
            "cancel_url": cancel_url,
        },
    })
}
