//! HTTP clients for the external providers.
//!
//! Each client owns a `reqwest::Client` plus a base URL, so tests can point
//! it at an in-process server. Response handling is uniform across every
//! endpoint: a non-2xx status is an upstream error with the message pulled
//! from the provider's error payload, and a 2xx body that still carries an
//! `error` field is treated as a failure as well.

pub mod fulfillment;
pub mod redirect;
pub mod token;

pub use fulfillment::FulfillmentClient;
pub use redirect::RedirectCheckoutClient;
pub use token::TokenPaymentClient;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::value_objects::MoneyError;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required credential is missing; reported per request, never at boot.
    #[error("{0}")]
    Configuration(String),

    /// The provider rejected the call or returned an error payload.
    #[error("{0}")]
    Upstream(String),

    /// Transport-level failure reaching the provider.
    #[error("{0}")]
    Network(String),

    /// The provider responded with a body we could not decode.
    #[error("invalid provider response: {0}")]
    Decode(String),
}

impl From<MoneyError> for ProviderError {
    fn from(err: MoneyError) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

/// One billable line sent to a payment provider. Amounts are integer minor
/// units derived once from the cart, so the itemized breakdown and any
/// aggregate total computed from it agree to the cent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLineItem {
    pub name: String,
    pub description: String,
    pub unit_amount_minor: i64,
    pub quantity: u32,
}

impl PaymentLineItem {
    pub fn from_cart(cart: &Cart) -> Result<Vec<Self>, MoneyError> {
        Self::from_lines(cart.lines())
    }

    pub fn from_lines(lines: &[CartLine]) -> Result<Vec<Self>, MoneyError> {
        lines
            .iter()
            .map(|line| {
                Ok(Self {
                    name: line.product_name.clone(),
                    description: line.variant_name.clone(),
                    unit_amount_minor: line.unit_price.minor_units()?,
                    quantity: line.quantity,
                })
            })
            .collect()
    }

    pub fn line_total_minor(&self) -> i64 {
        self.unit_amount_minor * i64::from(self.quantity)
    }
}

/// Render minor units as a two-decimal major-unit string, e.g. `6848` ->
/// `"68.48"`.
pub(crate) fn format_minor_units(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

/// Error payloads come in two shapes: `{"error": "..."}` and
/// `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: Option<String> },
}

impl ErrorDetail {
    fn message(&self) -> Option<&str> {
        match self {
            ErrorDetail::Text(s) => Some(s),
            ErrorDetail::Object { message } => message.as_deref(),
        }
    }
}

/// Read a provider response under the uniform error contract: non-2xx is
/// upstream, an `error` field in a 2xx body is upstream, anything that then
/// fails to parse is a decode error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(upstream_error(status, &body));
    }
    if let Ok(ErrorBody { error: Some(detail) }) = serde_json::from_str::<ErrorBody>(&body) {
        return Err(ProviderError::Upstream(
            detail
                .message()
                .unwrap_or("provider reported an error")
                .to_string(),
        ));
    }
    serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
}

fn upstream_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message().map(str::to_string))
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));
    ProviderError::Upstream(message)
}
