//! Environment-backed configuration.
//!
//! Provider credential blocks are optional at load time; a block whose key
//! is absent simply stays `None` and the corresponding endpoint reports a
//! configuration error when it is actually used. Startup never fails on
//! missing credentials.

use std::env;

use crate::providers::{fulfillment, redirect, token, ProviderError};

#[derive(Clone, Debug)]
pub struct StoreConfig {
    fulfillment: Option<FulfillmentConfig>,
    redirect: Option<RedirectConfig>,
    token: Option<TokenConfig>,
    pub public_url: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct FulfillmentConfig {
    pub api_key: String,
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct RedirectConfig {
    pub secret_key: String,
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub client_id: String,
    pub client_secret: String,
    pub mode: PaymentMode,
    pub api_url: String,
}

/// Which token-payment environment the service talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentMode {
    #[default]
    Sandbox,
    Live,
}

impl PaymentMode {
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("live") => PaymentMode::Live,
            _ => PaymentMode::Sandbox,
        }
    }

    pub fn default_api_url(self) -> &'static str {
        match self {
            PaymentMode::Sandbox => token::SANDBOX_API_URL,
            PaymentMode::Live => token::LIVE_API_URL,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let fulfillment = env::var("FULFILLMENT_API_KEY").ok().map(|api_key| {
            FulfillmentConfig {
                api_key,
                api_url: env::var("FULFILLMENT_API_URL")
                    .unwrap_or_else(|_| fulfillment::DEFAULT_API_URL.to_string()),
            }
        });

        let redirect = env::var("REDIRECT_PAYMENT_SECRET_KEY").ok().map(|secret_key| {
            RedirectConfig {
                secret_key,
                api_url: env::var("REDIRECT_PAYMENT_API_URL")
                    .unwrap_or_else(|_| redirect::DEFAULT_API_URL.to_string()),
            }
        });

        let token = match (
            env::var("TOKEN_PAYMENT_CLIENT_ID").ok(),
            env::var("TOKEN_PAYMENT_CLIENT_SECRET").ok(),
        ) {
            (Some(client_id), Some(client_secret)) => {
                let mode =
                    PaymentMode::from_env_value(env::var("TOKEN_PAYMENT_MODE").ok().as_deref());
                Some(TokenConfig {
                    client_id,
                    client_secret,
                    mode,
                    api_url: env::var("TOKEN_PAYMENT_API_URL")
                        .unwrap_or_else(|_| mode.default_api_url().to_string()),
                })
            }
            _ => None,
        };

        Self {
            fulfillment,
            redirect,
            token,
            public_url,
            port,
        }
    }

    pub fn fulfillment(&self) -> Result<&FulfillmentConfig, ProviderError> {
        self.fulfillment.as_ref().ok_or_else(|| {
            ProviderError::Configuration("fulfillment API key not configured".to_string())
        })
    }

    pub fn redirect(&self) -> Result<&RedirectConfig, ProviderError> {
        self.redirect.as_ref().ok_or_else(|| {
            ProviderError::Configuration("redirect payment secret key not configured".to_string())
        })
    }

    pub fn token(&self) -> Result<&TokenConfig, ProviderError> {
        self.token.as_ref().ok_or_else(|| {
            ProviderError::Configuration("token payment credentials not configured".to_string())
        })
    }

    /// Redirect target after a completed hosted checkout.
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.public_url)
    }

    /// Redirect target for an abandoned hosted checkout.
    pub fn cancel_url(&self) -> String {
        format!("{}/?canceled=true", self.public_url)
    }

    /// Return target for the token-payment approval flow.
    pub fn return_url(&self) -> String {
        format!("{}/success", self.public_url)
    }
}

/// Test-friendly constructor: all provider blocks filled in explicitly.
impl StoreConfig {
    pub fn with_providers(
        fulfillment: Option<FulfillmentConfig>,
        redirect: Option<RedirectConfig>,
        token: Option<TokenConfig>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            fulfillment,
            redirect,
            token,
            public_url: public_url.into(),
            port: 0,
        }
    }
}
