//! Variant selection over parsed facets.
//!
//! The index is built per product, in catalog order with first-seen wins:
//! picking a facet token always resolves to the first variant that carries
//! it. A color axis is only exposed when the variants span more than one
//! distinct color.

use serde::Serialize;

use crate::domain::aggregates::product::{Product, Variant};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetChoice {
    pub token: String,
    pub variant_id: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetIndex {
    sizes: Vec<FacetChoice>,
    colors: Vec<FacetChoice>,
}

impl FacetIndex {
    pub fn build(variants: &[Variant]) -> Self {
        let mut sizes: Vec<FacetChoice> = vec![];
        let mut colors: Vec<FacetChoice> = vec![];
        for variant in variants {
            if let Some(size) = &variant.facets.size {
                if !sizes.iter().any(|c| &c.token == size) {
                    sizes.push(FacetChoice {
                        token: size.clone(),
                        variant_id: variant.id,
                    });
                }
            }
            if let Some(color) = &variant.facets.color {
                if !colors.iter().any(|c| &c.token == color) {
                    colors.push(FacetChoice {
                        token: color.clone(),
                        variant_id: variant.id,
                    });
                }
            }
        }
        // A single color across the product is not a choice.
        if colors.len() < 2 {
            colors.clear();
        }
        Self { sizes, colors }
    }

    pub fn sizes(&self) -> &[FacetChoice] {
        &self.sizes
    }

    pub fn colors(&self) -> &[FacetChoice] {
        &self.colors
    }

    pub fn size_variant(&self, token: &str) -> Option<i64> {
        self.sizes
            .iter()
            .find(|c| c.token == token)
            .map(|c| c.variant_id)
    }

    pub fn color_variant(&self, token: &str) -> Option<i64> {
        self.colors
            .iter()
            .find(|c| c.token == token)
            .map(|c| c.variant_id)
    }
}

/// Resolve the variant for the chosen facets.
///
/// A chosen color takes precedence and re-selects the first variant with
/// that color, which may change the size that was previously in effect; a
/// matching size-and-color combination is not guaranteed to exist. With no
/// facets chosen the first variant is the default.
pub fn select_variant<'a>(
    product: &'a Product,
    size: Option<&str>,
    color: Option<&str>,
) -> Option<&'a Variant> {
    if let Some(color) = color {
        return product
            .variants
            .iter()
            .find(|v| v.facets.color.as_deref() == Some(color));
    }
    if let Some(size) = size {
        return product
            .variants
            .iter()
            .find(|v| v.facets.size.as_deref() == Some(size));
    }
    product.variants.first()
}
