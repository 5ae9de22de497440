//! Cart aggregate.
//!
//! Lines are keyed by `"{product_id}-{variant_id}"`; adding a variant that
//! is already present merges into the existing line. Insertion order is
//! preserved for display. The total is never stored, only recomputed from
//! the current lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::value_objects::Money;

/// Merge key for a cart line.
pub fn line_id(product_id: i64, variant_id: i64) -> String {
    format!("{product_id}-{variant_id}")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: String,
    pub product_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub variant_name: String,
    pub unit_price: Money,
    pub image_url: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            lines: vec![],
            currency: "USD".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines (the cart-badge number).
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Add one unit of `variant`, merging into an existing line when the
    /// same variant is already in the cart.
    pub fn add_item(&mut self, product: &Product, variant: &Variant) {
        self.add_item_with_quantity(product, variant, 1);
    }

    pub fn add_item_with_quantity(&mut self, product: &Product, variant: &Variant, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let id = line_id(product.id, variant.id);
        if let Some(existing) = self.lines.iter_mut().find(|l| l.line_id == id) {
            existing.quantity += quantity;
        } else {
            self.lines.push(CartLine {
                line_id: id,
                product_id: product.id,
                variant_id: variant.id,
                product_name: product.name.clone(),
                variant_name: variant.name.clone(),
                unit_price: variant.retail_price.clone(),
                image_url: product.display_image(variant).to_string(),
                quantity,
            });
        }
        self.touch();
    }

    /// Adjust a line's quantity by `delta`. Dropping to zero or below
    /// removes the line. Unknown line ids are a no-op.
    pub fn change_quantity(&mut self, line_id: &str, delta: i64) {
        let Some(line) = self.lines.iter_mut().find(|l| l.line_id == line_id) else {
            return;
        };
        let new_quantity = i64::from(line.quantity) + delta;
        if new_quantity <= 0 {
            self.lines.retain(|l| l.line_id != line_id);
        } else {
            line.quantity = new_quantity as u32;
        }
        self.touch();
    }

    /// Remove a line. Unknown line ids are a no-op.
    pub fn remove_item(&mut self, line_id: &str) {
        self.lines.retain(|l| l.line_id != line_id);
        self.touch();
    }

    /// Sum of `unit_price * quantity` over all lines. Rounding is applied
    /// only when the result is displayed, never per line.
    pub fn total(&self) -> Money {
        self.lines.iter().fold(Money::zero(&self.currency), |acc, l| {
            acc.add(&l.line_total()).unwrap_or(acc)
        })
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}
