//! Weapons, armor, shields and carried items.

use serde::{Deserialize, Serialize};

/// Damage type reported by attacks and spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DamageType {
    /// Swords and axes.
    Slashing,
    /// Spears, daggers, arrows, fangs.
    Piercing,
    /// Maces, clubs, fists.
    Bludgeoning,
    /// Flame.
    Fire,
    /// Ice.
    Cold,
    /// Lightning.
    Electricity,
    /// Thunder.
    Sonic,
    /// Necromantic harm.
    Negative,
    /// Toxins.
    Poison,
}

impl DamageType {
    /// Lower-case label used in narrated log lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Slashing => "slashing",
            Self::Piercing => "piercing",
            Self::Bludgeoning => "bludgeoning",
            Self::Fire => "fire",
            Self::Cold => "cold",
            Self::Electricity => "electricity",
            Self::Sonic => "sonic",
            Self::Negative => "negative",
            Self::Poison => "poison",
        }
    }
}

/// A weapon or natural attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Damage dice notation, e.g. `1d8`.
    pub damage: String,
    /// Damage type dealt.
    pub damage_type: DamageType,
    /// Whether Weapon Finesse may substitute DEX for STR on attack rolls.
    #[serde(default)]
    pub finesse: bool,
    /// Magic enhancement added to attack and damage.
    #[serde(default)]
    pub enhancement: i32,
}

impl Weapon {
    /// Builds a mundane weapon.
    #[must_use]
    pub fn new(id: &str, name: &str, damage: &str, damage_type: DamageType) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            damage: damage.to_owned(),
            damage_type,
            finesse: false,
            enhancement: 0,
        }
    }

    /// Marks the weapon as finesse-capable.
    #[must_use]
    pub fn finesse(mut self) -> Self {
        self.finesse = true;
        self
    }

    /// Unarmed strike used when nothing is wielded.
    #[must_use]
    pub fn unarmed() -> Self {
        Self::new("unarmed", "Unarmed strike", "1d3", DamageType::Bludgeoning)
    }
}

/// Body armor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Armor {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Armor bonus to AC.
    pub armor_bonus: i32,
    /// Cap on the DEX modifier added to AC; `None` for no cap.
    pub max_dex: Option<i32>,
}

/// A shield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shield {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Shield bonus to AC.
    pub shield_bonus: i32,
}

/// Everything an entity carries into a fight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    /// Wielded weapon; unarmed when absent.
    #[serde(default)]
    pub weapon: Option<Weapon>,
    /// Worn armor.
    #[serde(default)]
    pub armor: Option<Armor>,
    /// Carried shield.
    #[serde(default)]
    pub shield: Option<Shield>,
    /// Consumable item ids usable in combat, one entry per unit.
    #[serde(default)]
    pub items: Vec<String>,
}

impl Equipment {
    /// The wielded weapon, or an unarmed strike.
    #[must_use]
    pub fn weapon_or_unarmed(&self) -> Weapon {
        self.weapon.clone().unwrap_or_else(Weapon::unarmed)
    }

    /// Armor bonus from worn armor.
    #[must_use]
    pub fn armor_bonus(&self) -> i32 {
        self.armor.as_ref().map_or(0, |a| a.armor_bonus)
    }

    /// Shield bonus from a carried shield.
    #[must_use]
    pub fn shield_bonus(&self) -> i32 {
        self.shield.as_ref().map_or(0, |s| s.shield_bonus)
    }

    /// Caps `dex_modifier` by the worn armor's max-DEX.
    #[must_use]
    pub fn capped_dex(&self, dex_modifier: i32) -> i32 {
        match self.armor.as_ref().and_then(|a| a.max_dex) {
            Some(cap) => dex_modifier.min(cap),
            None => dex_modifier,
        }
    }

    /// Whether `item_id` is in the pack.
    #[must_use]
    pub fn has_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i == item_id)
    }

    /// Returns a copy with one unit of `item_id` removed, or `None` if absent.
    #[must_use]
    pub fn without_item(&self, item_id: &str) -> Option<Self> {
        let index = self.items.iter().position(|i| i == item_id)?;
        let mut next = self.clone();
        next.items.remove(index);
        Some(next)
    }
}
