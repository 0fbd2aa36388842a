//! Resource ledger: limited-use abilities and spell slots.
//!
//! Every operation returns a new ledger (or a new entity) and leaves its
//! input untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::StatBlock;

/// How often a limited ability refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageKind {
    /// Never depletes.
    AtWill,
    /// Refreshes when an encounter ends.
    Encounter,
    /// Refreshes on a long rest.
    Daily,
}

/// A named ability with a use counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedAbility {
    /// Ability name, referenced by feats as their resource cost.
    pub name: String,
    /// Refresh cadence.
    pub usage: UsageKind,
    /// Uses after a full refresh.
    pub max_uses: u32,
    /// Uses left.
    pub current_uses: u32,
}

impl LimitedAbility {
    /// Builds a fully-charged ability.
    #[must_use]
    pub fn new(name: &str, usage: UsageKind, max_uses: u32) -> Self {
        Self {
            name: name.to_owned(),
            usage,
            max_uses,
            current_uses: max_uses,
        }
    }
}

/// Slots for one spell level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellSlotPool {
    /// Slots after a long rest.
    pub max: u32,
    /// Slots left.
    pub current: u32,
}

/// A reference to something the ledger can spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum ResourceRef {
    /// A limited ability by name.
    Ability(String),
    /// One slot of the given spell level.
    SpellSlot(u8),
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ability(name) => write!(f, "{name}"),
            Self::SpellSlot(level) => write!(f, "level {level} spell slot"),
        }
    }
}

/// Why a resource could not be spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceFailure {
    /// The resource exists but has no uses left.
    #[error("not enough resources: {0} is depleted")]
    Depleted(String),
    /// The entity has no such resource at all.
    #[error("not enough resources: no {0} available")]
    NotOwned(String),
}

/// Per-entity limited abilities and spell-slot pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLedger {
    /// Limited-use abilities in acquisition order.
    #[serde(default)]
    pub abilities: Vec<LimitedAbility>,
    /// Spell-slot pools keyed by spell level (1 and up).
    #[serde(default)]
    pub spell_slots: BTreeMap<u8, SpellSlotPool>,
}

impl ResourceLedger {
    /// Remaining uses of `resource`. At-will abilities report `u32::MAX`.
    #[must_use]
    pub fn remaining(&self, resource: &ResourceRef) -> Option<u32> {
        match resource {
            ResourceRef::Ability(name) => self.ability(name).map(|a| match a.usage {
                UsageKind::AtWill => u32::MAX,
                UsageKind::Encounter | UsageKind::Daily => a.current_uses,
            }),
            ResourceRef::SpellSlot(level) => self.spell_slots.get(level).map(|p| p.current),
        }
    }

    /// Whether `resource` can be spent right now.
    #[must_use]
    pub fn can_spend(&self, resource: &ResourceRef) -> bool {
        self.remaining(resource).is_some_and(|n| n > 0)
    }

    /// Looks up an ability by name.
    #[must_use]
    pub fn ability(&self, name: &str) -> Option<&LimitedAbility> {
        self.abilities.iter().find(|a| a.name == name)
    }

    /// Spends one use of `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceFailure::NotOwned`] if the ledger has no such entry
    /// and [`ResourceFailure::Depleted`] if it has no uses left.
    pub fn consume(&self, resource: &ResourceRef) -> Result<Self, ResourceFailure> {
        let mut next = self.clone();
        match resource {
            ResourceRef::Ability(name) => {
                let ability = next
                    .abilities
                    .iter_mut()
                    .find(|a| &a.name == name)
                    .ok_or_else(|| ResourceFailure::NotOwned(resource.to_string()))?;
                match ability.usage {
                    UsageKind::AtWill => {}
                    UsageKind::Encounter | UsageKind::Daily => {
                        if ability.current_uses == 0 {
                            return Err(ResourceFailure::Depleted(resource.to_string()));
                        }
                        ability.current_uses -= 1;
                    }
                }
            }
            ResourceRef::SpellSlot(level) => {
                let pool = next
                    .spell_slots
                    .get_mut(level)
                    .ok_or_else(|| ResourceFailure::NotOwned(resource.to_string()))?;
                if pool.current == 0 {
                    return Err(ResourceFailure::Depleted(resource.to_string()));
                }
                pool.current -= 1;
            }
        }
        Ok(next)
    }

    /// Resets every ability and every slot pool to its maximum.
    #[must_use]
    pub fn restore(&self) -> Self {
        let mut next = self.clone();
        for ability in &mut next.abilities {
            ability.current_uses = ability.max_uses;
        }
        for pool in next.spell_slots.values_mut() {
            pool.current = pool.max;
        }
        next
    }

    /// Resets encounter-usage abilities only.
    #[must_use]
    pub fn restore_encounter(&self) -> Self {
        let mut next = self.clone();
        for ability in &mut next.abilities {
            if ability.usage == UsageKind::Encounter {
                ability.current_uses = ability.max_uses;
            }
        }
        next
    }

    /// Returns a ledger whose slot maxima match `maxima`.
    ///
    /// Pools that grow gain the difference in current slots; new pools
    /// start full.
    #[must_use]
    pub fn with_slot_maxima(&self, maxima: &BTreeMap<u8, u32>) -> Self {
        let mut next = self.clone();
        for (level, max) in maxima {
            let pool = next.spell_slots.entry(*level).or_insert(SpellSlotPool {
                max: 0,
                current: 0,
            });
            let gained = max.saturating_sub(pool.max);
            pool.max = *max;
            pool.current = (pool.current + gained).min(*max);
        }
        next
    }

    /// Adds `ability` unless one with the same name exists.
    #[must_use]
    pub fn with_ability(&self, ability: LimitedAbility) -> Self {
        let mut next = self.clone();
        if next.ability(&ability.name).is_none() {
            next.abilities.push(ability);
        }
        next
    }
}

/// Spends `resource` from `entity`'s ledger.
///
/// # Errors
///
/// Propagates [`ResourceFailure`]; the input entity is never modified.
pub fn consume<E: StatBlock>(entity: &E, resource: &ResourceRef) -> Result<E, ResourceFailure> {
    let ledger = entity.resources().consume(resource)?;
    tracing::debug!(entity = entity.name(), %resource, "resource consumed");
    Ok(entity.with_resources(ledger))
}

/// Fully restores `entity`'s ledger.
#[must_use]
pub fn restore<E: StatBlock>(entity: &E) -> E {
    entity.with_resources(entity.resources().restore())
}

/// Restores `entity`'s encounter abilities.
#[must_use]
pub fn restore_encounter<E: StatBlock>(entity: &E) -> E {
    entity.with_resources(entity.resources().restore_encounter())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> ResourceLedger {
        let mut spell_slots = BTreeMap::new();
        spell_slots.insert(1, SpellSlotPool { max: 2, current: 2 });
        ResourceLedger {
            abilities: vec![
                LimitedAbility::new("battle_rage", UsageKind::Daily, 1),
                LimitedAbility::new("poison_vial", UsageKind::Encounter, 2),
                LimitedAbility::new("second_wind", UsageKind::AtWill, 0),
            ],
            spell_slots,
        }
    }

    #[test]
    fn test_consume_decrements_and_leaves_input_untouched() {
        let original = ledger();
        let resource = ResourceRef::Ability("battle_rage".to_owned());

        let spent = original.consume(&resource).unwrap();

        assert_eq!(spent.remaining(&resource), Some(0));
        assert_eq!(original.remaining(&resource), Some(1));
    }

    #[test]
    fn test_consume_depleted_fails_without_going_negative() {
        let resource = ResourceRef::Ability("battle_rage".to_owned());
        let spent = ledger().consume(&resource).unwrap();

        let result = spent.consume(&resource);

        assert_eq!(
            result,
            Err(ResourceFailure::Depleted("battle_rage".to_owned()))
        );
        assert_eq!(spent.ability("battle_rage").unwrap().current_uses, 0);
    }

    #[test]
    fn test_at_will_never_depletes() {
        let resource = ResourceRef::Ability("second_wind".to_owned());
        let mut current = ledger();
        for _ in 0..5 {
            current = current.consume(&resource).unwrap();
        }
        assert!(current.can_spend(&resource));
    }

    #[test]
    fn test_unknown_resource_is_not_owned() {
        let result = ledger().consume(&ResourceRef::SpellSlot(3));
        assert_eq!(
            result,
            Err(ResourceFailure::NotOwned("level 3 spell slot".to_owned()))
        );
    }

    #[test]
    fn test_restore_resets_everything() {
        let spent = ledger()
            .consume(&ResourceRef::Ability("battle_rage".to_owned()))
            .unwrap()
            .consume(&ResourceRef::Ability("poison_vial".to_owned()))
            .unwrap()
            .consume(&ResourceRef::SpellSlot(1))
            .unwrap();

        let restored = spent.restore();

        assert_eq!(restored, ledger());
        assert_ne!(spent, ledger());
    }

    #[test]
    fn test_restore_encounter_skips_daily_abilities() {
        let spent = ledger()
            .consume(&ResourceRef::Ability("battle_rage".to_owned()))
            .unwrap()
            .consume(&ResourceRef::Ability("poison_vial".to_owned()))
            .unwrap();

        let restored = spent.restore_encounter();

        assert_eq!(restored.ability("poison_vial").unwrap().current_uses, 2);
        assert_eq!(restored.ability("battle_rage").unwrap().current_uses, 0);
    }

    #[test]
    fn test_with_slot_maxima_grows_pools() {
        let spent = ledger().consume(&ResourceRef::SpellSlot(1)).unwrap();
        let mut maxima = BTreeMap::new();
        maxima.insert(1, 3);
        maxima.insert(2, 2);

        let grown = spent.with_slot_maxima(&maxima);

        assert_eq!(grown.spell_slots[&1], SpellSlotPool { max: 3, current: 2 });
        assert_eq!(grown.spell_slots[&2], SpellSlotPool { max: 2, current: 2 });
    }
}
