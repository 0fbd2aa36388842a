//! Carried items and gold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Item counts keyed by item id, plus the purse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Quantity per item id. Zero counts are never stored.
    #[serde(default)]
    pub items: BTreeMap<String, u32>,
    /// Gold pieces.
    #[serde(default)]
    pub gold: u32,
}

impl Inventory {
    /// How many of `item_id` are carried.
    #[must_use]
    pub fn count(&self, item_id: &str) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// Whether at least one `item_id` is carried.
    #[must_use]
    pub fn has(&self, item_id: &str) -> bool {
        self.count(item_id) > 0
    }

    /// Returns a copy with `quantity` more of `item_id`.
    #[must_use]
    pub fn with_item(&self, item_id: &str, quantity: u32) -> Self {
        let mut next = self.clone();
        if quantity > 0 {
            let count = next.items.entry(item_id.to_owned()).or_insert(0);
            *count = count.saturating_add(quantity);
        }
        next
    }

    /// Returns a copy with `quantity` fewer of `item_id`, or `None` if
    /// fewer than `quantity` are carried.
    #[must_use]
    pub fn without_item(&self, item_id: &str, quantity: u32) -> Option<Self> {
        let have = self.count(item_id);
        if have < quantity {
            return None;
        }
        let mut next = self.clone();
        if have == quantity {
            next.items.remove(item_id);
        } else {
            next.items.insert(item_id.to_owned(), have - quantity);
        }
        Some(next)
    }

    /// Returns a copy with `amount` gold added.
    #[must_use]
    pub fn with_gold_added(&self, amount: u32) -> Self {
        Self {
            gold: self.gold.saturating_add(amount),
            ..self.clone()
        }
    }

    /// Returns a copy with `amount` gold paid, or `None` if the purse is
    /// short.
    #[must_use]
    pub fn paying(&self, amount: u32) -> Option<Self> {
        self.gold.checked_sub(amount).map(|gold| Self {
            gold,
            ..self.clone()
        })
    }

    /// Returns a copy with up to `amount` gold lost.
    #[must_use]
    pub fn losing_gold(&self, amount: u32) -> Self {
        Self {
            gold: self.gold.saturating_sub(amount),
            ..self.clone()
        }
    }

    /// Expands counts into one id per unit, in id order.
    #[must_use]
    pub fn units(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|(id, count)| std::iter::repeat_n(id.clone(), *count as usize))
            .collect()
    }
}
