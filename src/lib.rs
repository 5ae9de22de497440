//! Driftwear Storefront
//!
//! Backend for a print-on-demand storefront.
//!
//! ## Features
//! - Catalog aggregation from the fulfillment provider
//! - Session-keyed in-memory shopping cart
//! - Variant selection over parsed size/color facets
//! - Checkout against fulfillment, redirect, and token payment providers

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod providers;
pub mod server;
