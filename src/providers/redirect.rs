//! Redirect payment provider client: hosted checkout sessions.
//!
//! The session-create endpoint takes form-encoded, bracket-indexed fields
//! and answers with a session id plus the hosted page URL the browser must
//! be sent to. Nothing else of the provider surface is used.

use reqwest::Client;
use serde::Deserialize;

use crate::providers::{read_json, PaymentLineItem, ProviderError};

pub const DEFAULT_API_URL: &str = "https://api.stripe.com";

/// Countries the hosted page may collect a shipping address for.
const ALLOWED_SHIPPING_COUNTRIES: [&str; 6] = ["US", "CA", "GB", "AU", "ZM", "ZA"];

#[derive(Clone)]
pub struct RedirectCheckoutClient {
    http: Client,
    api_url: String,
    secret_key: String,
}

/// A created hosted checkout session. The caller must navigate the browser
/// to `url`; nothing happens until the customer completes the hosted page.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

impl RedirectCheckoutClient {
    pub fn new(http: Client, api_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            secret_key: secret_key.into(),
        }
    }

    pub async fn create_session(
        &self,
        items: &[PaymentLineItem],
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        let params = session_params(items, customer_email, success_url, cancel_url);
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        read_json(response).await
    }
}

fn session_params(
    items: &[PaymentLineItem],
    customer_email: &str,
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), success_url.into()),
        ("cancel_url".into(), cancel_url.into()),
        ("customer_email".into(), customer_email.into()),
    ];
    for (i, item) in items.iter().enumerate() {
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".into(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][description]"),
            item.description.clone(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount_minor.to_string(),
        ));
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }
    for (i, country) in ALLOWED_SHIPPING_COUNTRIES.iter().enumerate() {
        params.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            (*country).to_string(),
        ));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> PaymentLineItem {
        PaymentLineItem {
            name: "Harbor Tee".into(),
            description: "Harbor Tee - Black - M".into(),
            unit_amount_minor: 1999,
            quantity: 2,
        }
    }

    #[test]
    fn test_session_params_shape() {
        let params = session_params(
            &[item()],
            "ada@example.com",
            "http://localhost:8080/success?session_id={CHECKOUT_SESSION_ID}",
            "http://localhost:8080/?canceled=true",
        );
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("customer_email"), Some("ada@example.com"));
        assert_eq!(
            get("line_items[0][price_data][unit_amount]"),
            Some("1999")
        );
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Harbor Tee")
        );
        assert_eq!(
            get("shipping_address_collection[allowed_countries][0]"),
            Some("US")
        );
    }

    #[test]
    fn test_session_params_index_multiple_items() {
        let second = PaymentLineItem {
            name: "Cap".into(),
            description: "Cap - One Size".into(),
            unit_amount_minor: 950,
            quantity: 3,
        };
        let params = session_params(&[item(), second], "a@b.c", "s", "c");
        assert!(params
            .iter()
            .any(|(k, v)| k == "line_items[1][price_data][unit_amount]" && v == "950"));
        assert!(params.iter().any(|(k, v)| k == "line_items[1][quantity]" && v == "3"));
    }
}
