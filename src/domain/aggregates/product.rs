//! Catalog product model.
//!
//! Products arrive denormalized from the fulfillment provider: a summary
//! from the list call merged with variant detail from the per-product call.
//! They are immutable once built; a re-fetch replaces the whole catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::Money;

/// Delimiter between the descriptive part of a variant name and its facet
/// tokens, e.g. `"Harbor Tee - Black - M"`.
pub const FACET_DELIMITER: &str = " - ";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub facets: VariantFacets,
    pub retail_price: Money,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub preview_images: Vec<String>,
}

/// Facets parsed out of a variant name, once, at catalog-load time.
///
/// The provider encodes facets as name suffixes: the last `" - "` token is
/// the size, the second-to-last is the color when the name carries at
/// least two tokens. The tokenization is load-bearing and must not change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFacets {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl VariantFacets {
    pub fn parse(name: &str) -> Self {
        if name.is_empty() {
            return Self::default();
        }
        let tokens: Vec<&str> = name.split(FACET_DELIMITER).collect();
        let size = tokens.last().map(|t| t.to_string());
        let color = (tokens.len() >= 2).then(|| tokens[tokens.len() - 2].to_string());
        Self { size, color }
    }
}

impl Variant {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        retail_price: Money,
        sku: Option<String>,
        preview_images: Vec<String>,
    ) -> Self {
        let name = name.into();
        let facets = VariantFacets::parse(&name);
        Self {
            id,
            name,
            facets,
            retail_price,
            sku,
            preview_images,
        }
    }

    pub fn preview_image(&self) -> Option<&str> {
        self.preview_images.first().map(String::as_str)
    }
}

impl Product {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        thumbnail_url: impl Into<String>,
        variants: Vec<Variant>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            thumbnail_url: thumbnail_url.into(),
            variants,
        }
    }

    pub fn variant(&self, variant_id: i64) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Image shown for a cart line: the variant's first preview, falling
    /// back to the product thumbnail.
    pub fn display_image<'a>(&'a self, variant: &'a Variant) -> &'a str {
        variant.preview_image().unwrap_or(&self.thumbnail_url)
    }

    /// Price range across variants, for the product card.
    pub fn price_range(&self) -> Option<PriceRange> {
        let mut prices = self.variants.iter().map(|v| v.retail_price.amount());
        let first = prices.next()?;
        let (min, max) = prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(PriceRange {
            min: Money::usd(min),
            max: Money::usd(max),
        })
    }
}

/// Minimum (and, when prices differ, maximum) variant price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min.formatted())
        } else {
            write!(f, "{} - {}", self.min.formatted(), self.max.formatted())
        }
    }
}
