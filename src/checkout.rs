//! Checkout orchestration.
//!
//! A checkout attempt is a state machine: `Idle -> Submitting -> Success`
//! or `Failed`. The orchestrator makes exactly one provider submission per
//! attempt and clears the cart only on the terminal success signal. The
//! three submission paths sit behind one `PaymentProvider` trait; each
//! implementation supplies only its request/response mapping.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::domain::aggregates::Cart;
use crate::providers::fulfillment::{FulfillmentClient, OrderRequest, Recipient};
use crate::providers::redirect::RedirectCheckoutClient;
use crate::providers::token::TokenPaymentClient;
use crate::providers::{PaymentLineItem, ProviderError};

pub const DEFAULT_COUNTRY: &str = "US";

/// Shipping and contact details collected at checkout. Everything except
/// the country is required; the country falls back to a fixed default.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "ZIP code is required"))]
    pub zip: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            country: default_country(),
        }
    }
}

impl CheckoutForm {
    /// Validate the form and derive the fulfillment recipient.
    pub fn recipient(&self) -> Result<Recipient, FormError> {
        self.validate()?;
        let country = if self.country.is_empty() {
            DEFAULT_COUNTRY.to_string()
        } else {
            self.country.clone()
        };
        Ok(Recipient {
            name: format!("{} {}", self.first_name, self.last_name),
            address1: self.address.clone(),
            city: self.city.clone(),
            state_code: self.state.clone(),
            country_code: country,
            zip: self.zip.clone(),
            email: self.email.clone(),
        })
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FormError(String);

impl From<validator::ValidationErrors> for FormError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|field| field.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .next()
            .unwrap_or_else(|| "invalid checkout form".to_string());
        FormError(message)
    }
}

/// What a successful submission produced.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckoutOutcome {
    /// Fulfillment order accepted.
    OrderPlaced { order_id: String },
    /// Hosted session created; the browser must navigate to `url`.
    RedirectRequired { session_id: String, url: String },
    /// Token payment captured.
    PaymentCaptured {
        order_id: String,
        capture: serde_json::Value,
    },
}

/// Capability interface over the submission paths.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn submit(
        &self,
        cart: &Cart,
        recipient: &Recipient,
    ) -> Result<CheckoutOutcome, ProviderError>;
}

/// Fulfillment-direct path: the cart becomes an order request and success
/// is the provider returning an order identifier.
#[async_trait]
impl PaymentProvider for FulfillmentClient {
    async fn submit(
        &self,
        cart: &Cart,
        recipient: &Recipient,
    ) -> Result<CheckoutOutcome, ProviderError> {
        let order = OrderRequest::from_cart(cart, recipient.clone());
        let confirmation = self.create_order(&order).await?;
        Ok(CheckoutOutcome::OrderPlaced {
            order_id: confirmation.id.to_string(),
        })
    }
}

/// Redirect path: success is the receipt of a session id and URL; actual
/// payment happens on the hosted page after the handoff.
pub struct RedirectSubmission {
    pub client: RedirectCheckoutClient,
    pub success_url: String,
    pub cancel_url: String,
}

#[async_trait]
impl PaymentProvider for RedirectSubmission {
    async fn submit(
        &self,
        cart: &Cart,
        recipient: &Recipient,
    ) -> Result<CheckoutOutcome, ProviderError> {
        let items = PaymentLineItem::from_cart(cart)?;
        let session = self
            .client
            .create_session(&items, &recipient.email, &self.success_url, &self.cancel_url)
            .await?;
        Ok(CheckoutOutcome::RedirectRequired {
            session_id: session.id,
            url: session.url,
        })
    }
}

/// Token path: create an order intent, then capture it. A failure at
/// either step stops the flow; capture is never attempted after a failed
/// create.
pub struct TokenSubmission {
    pub client: TokenPaymentClient,
    pub return_url: String,
    pub cancel_url: String,
}

#[async_trait]
impl PaymentProvider for TokenSubmission {
    async fn submit(
        &self,
        cart: &Cart,
        _recipient: &Recipient,
    ) -> Result<CheckoutOutcome, ProviderError> {
        let items = PaymentLineItem::from_cart(cart)?;
        let order_id = self
            .client
            .create_order(&items, &self.return_url, &self.cancel_url)
            .await?;
        let capture = self.client.capture_order(&order_id).await?;
        Ok(CheckoutOutcome::PaymentCaptured { order_id, capture })
    }
}

/// Per-attempt checkout state. Submitting blocks further submits; Failed
/// keeps its message until the next attempt replaces it.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Success { outcome: CheckoutOutcome },
    Failed { message: String },
}

#[derive(Debug, Default)]
pub struct CheckoutOrchestrator {
    state: CheckoutState,
}

impl CheckoutOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_state(state: CheckoutState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Drive one checkout attempt. A submit while another is in flight is
    /// refused and leaves the in-flight attempt untouched. Validation
    /// failures and empty carts fail without touching the provider. The
    /// cart is cleared only on the terminal success signal, never
    /// speculatively.
    pub async fn submit(
        &mut self,
        cart: &mut Cart,
        form: &CheckoutForm,
        provider: &dyn PaymentProvider,
    ) -> &CheckoutState {
        if matches!(self.state, CheckoutState::Submitting) {
            return &self.state;
        }
        let recipient = match form.recipient() {
            Ok(recipient) => recipient,
            Err(err) => {
                self.state = CheckoutState::Failed {
                    message: err.to_string(),
                };
                return &self.state;
            }
        };
        if cart.is_empty() {
            self.state = CheckoutState::Failed {
                message: "cart is empty".to_string(),
            };
            return &self.state;
        }

        self.state = CheckoutState::Submitting;
        match provider.submit(cart, &recipient).await {
            Ok(outcome) => {
                cart.clear();
                self.state = CheckoutState::Success { outcome };
            }
            Err(err) => {
                tracing::warn!(error = %err, "checkout submission failed");
                self.state = CheckoutState::Failed {
                    message: err.to_string(),
                };
            }
        }
        &self.state
    }

    /// Acknowledge a terminal state (success display delay elapsed, or the
    /// surface was closed) and return to idle. A no-op while submitting.
    pub fn finish(&mut self) {
        if !matches!(self.state, CheckoutState::Submitting) {
            self.state = CheckoutState::Idle;
        }
    }
}
