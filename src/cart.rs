//! Session cart: works the same for guests and signed-in customers.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub quantity: i32,
    /// Unit price when the product was first added.
    pub price: i64,
}

impl CartEntry {
    pub fn total_price(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    entries: BTreeMap<Uuid, CartEntry>,
}

impl Cart {
    pub fn add(&mut self, product_id: Uuid, price: i64, quantity: i32) {
        let entry = self
            .entries
            .entry(product_id)
            .or_insert(CartEntry { quantity: 0, price });
        entry.quantity = entry.quantity.saturating_add(quantity);
    }

    /// Set a line's quantity; zero or less drops the line.
    /// Returns false when the product is not in the cart.
    pub fn update(&mut self, product_id: Uuid, quantity: i32) -> bool {
        if !self.entries.contains_key(&product_id) {
            return false;
        }
        if quantity > 0 {
            if let Some(entry) = self.entries.get_mut(&product_id) {
                entry.quantity = quantity;
            }
        } else {
            self.entries.remove(&product_id);
        }
        true
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        self.entries.remove(&product_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartEntry> {
        self.entries.get(&product_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Uuid, &CartEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.entries.keys().copied().collect()
    }

    /// Drop lines whose product no longer exists.
    pub fn retain_products(&mut self, known: &HashSet<Uuid>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| known.contains(id));
        before - self.entries.len()
    }

    /// Total number of units, not lines.
    pub fn item_count(&self) -> i64 {
        self.entries.values().map(|e| i64::from(e.quantity)).sum()
    }

    pub fn line_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_price(&self) -> i64 {
        self.entries.values().map(CartEntry::total_price).sum()
    }
}
