//! Merchant trades.
//!
//! A shop sells what it stocks at its listed price and buys back anything
//! it lists a price for at half that price, rounded down, minimum 1.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::world::WorldState;

/// Why a trade did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeFailure {
    /// The purse is short.
    #[error("not enough gold: {item_id} costs {price}, you have {gold}")]
    InsufficientGold {
        /// Item being bought.
        item_id: String,
        /// Asking price.
        price: u32,
        /// Gold carried.
        gold: u32,
    },
    /// The shop does not stock or price the item.
    #[error("the merchant does not trade in {0}")]
    NotForSale(String),
    /// The party has none to sell.
    #[error("you have no {0} to sell")]
    NotOwned(String),
}

/// A merchant's stock and prices, as declared by a `merchant` outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    /// Item ids offered for sale.
    #[serde(default)]
    pub shop_inventory: Vec<String>,
    /// Gold price per item id.
    #[serde(default)]
    pub buy_prices: BTreeMap<String, u32>,
}

impl Shop {
    /// Price of buying `item_id`, if the shop sells it.
    #[must_use]
    pub fn price(&self, item_id: &str) -> Option<u32> {
        if !self.shop_inventory.iter().any(|i| i == item_id) {
            return None;
        }
        self.buy_prices.get(item_id).copied()
    }

    /// What the shop pays for `item_id`, if it trades in it.
    #[must_use]
    pub fn sell_price(&self, item_id: &str) -> Option<u32> {
        self.buy_prices.get(item_id).map(|price| (price / 2).max(1))
    }

    /// Buys one `item_id`.
    ///
    /// # Errors
    ///
    /// [`TradeFailure::NotForSale`] if not stocked,
    /// [`TradeFailure::InsufficientGold`] if the purse is short.
    pub fn buy(&self, world: &WorldState, item_id: &str) -> Result<WorldState, TradeFailure> {
        let price = self
            .price(item_id)
            .ok_or_else(|| TradeFailure::NotForSale(item_id.to_owned()))?;
        let inventory = world
            .inventory
            .paying(price)
            .ok_or_else(|| TradeFailure::InsufficientGold {
                item_id: item_id.to_owned(),
                price,
                gold: world.inventory.gold,
            })?
            .with_item(item_id, 1);
        info!(item = item_id, price, "item bought");
        Ok(world.with_inventory(inventory))
    }

    /// Sells one `item_id`.
    ///
    /// # Errors
    ///
    /// [`TradeFailure::NotForSale`] if the shop does not price it,
    /// [`TradeFailure::NotOwned`] if none is carried.
    pub fn sell(&self, world: &WorldState, item_id: &str) -> Result<WorldState, TradeFailure> {
        let price = self
            .sell_price(item_id)
            .ok_or_else(|| TradeFailure::NotForSale(item_id.to_owned()))?;
        let inventory = world
            .inventory
            .without_item(item_id, 1)
            .ok_or_else(|| TradeFailure::NotOwned(item_id.to_owned()))?
            .with_gold_added(price);
        info!(item = item_id, price, "item sold");
        Ok(world.with_inventory(inventory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apothecary() -> Shop {
        Shop {
            shop_inventory: vec!["healing_potion".to_owned(), "antitoxin".to_owned()],
            buy_prices: BTreeMap::from([
                ("healing_potion".to_owned(), 50),
                ("antitoxin".to_owned(), 25),
                ("wolf_pelt".to_owned(), 9),
            ]),
        }
    }

    #[test]
    fn test_buy_moves_gold_into_item() {
        let world = WorldState::new("ashfall").give_gold(60);

        let after = apothecary().buy(&world, "healing_potion").unwrap();

        assert_eq!(after.inventory.gold, 10);
        assert_eq!(after.inventory.count("healing_potion"), 1);
    }

    #[test]
    fn test_buy_with_short_purse_fails() {
        let world = WorldState::new("ashfall").give_gold(20);

        assert_eq!(
            apothecary().buy(&world, "antitoxin"),
            Err(TradeFailure::InsufficientGold {
                item_id: "antitoxin".to_owned(),
                price: 25,
                gold: 20,
            })
        );
    }

    #[test]
    fn test_priced_but_unstocked_item_is_not_for_sale() {
        let world = WorldState::new("ashfall").give_gold(100);

        assert_eq!(
            apothecary().buy(&world, "wolf_pelt"),
            Err(TradeFailure::NotForSale("wolf_pelt".to_owned()))
        );
    }

    #[test]
    fn test_sell_pays_half_price_rounded_down() {
        let world = WorldState::new("ashfall").give_item("wolf_pelt");

        let after = apothecary().sell(&world, "wolf_pelt").unwrap();

        assert_eq!(after.inventory.gold, 4);
        assert!(!after.inventory.has("wolf_pelt"));
    }

    #[test]
    fn test_sell_without_item_fails() {
        let world = WorldState::new("ashfall");

        assert_eq!(
            apothecary().sell(&world, "antitoxin"),
            Err(TradeFailure::NotOwned("antitoxin".to_owned()))
        );
    }
}
