//! Session reference prices.

use coinwatch_core::{Price, ProductId};
use std::collections::HashMap;
use tracing::info;

/// First observed price per product, fixed for the rest of the session.
///
/// Only strictly positive prices seed a baseline, so a stored reference is
/// always a valid divisor.
#[derive(Debug, Default, Clone)]
pub struct BaselineTracker {
    references: HashMap<ProductId, Price>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `price` as the baseline if the product has none yet.
    ///
    /// Returns the baseline in effect after the call: the existing one,
    /// the newly stored one, or None when no baseline exists and `price`
    /// could not seed one.
    pub fn observe(&mut self, product_id: &ProductId, price: Price) -> Option<Price> {
        if let Some(existing) = self.references.get(product_id) {
            return Some(*existing);
        }
        if !price.is_positive() {
            return None;
        }

        info!(%product_id, reference = %price, "Baseline initialized");
        self.references.insert(product_id.clone(), price);
        Some(price)
    }

    pub fn get(&self, product_id: &ProductId) -> Option<Price> {
        self.references.get(product_id).copied()
    }

    pub fn is_initialized(&self, product_id: &ProductId) -> bool {
        self.references.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Forget every baseline (end of session).
    pub fn clear(&mut self) {
        self.references.clear();
    }
}
