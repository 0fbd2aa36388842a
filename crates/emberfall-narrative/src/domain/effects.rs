//! World and character effects.

use emberfall_character::domain::{Character, StatBlock, default_character};
use emberfall_combat::domain::EncounterSpec;
use emberfall_world_state::domain::{FlagValue, WorldState};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::Trigger;

/// How much a `heal` effect restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HealWire", into = "HealWire")]
pub enum HealAmount {
    /// A fixed number of hit points.
    Points(i32),
    /// Back to maximum.
    Full,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HealWire {
    Points(i32),
    Keyword(String),
}

impl TryFrom<HealWire> for HealAmount {
    type Error = String;

    fn try_from(wire: HealWire) -> Result<Self, Self::Error> {
        match wire {
            HealWire::Points(points) => Ok(Self::Points(points)),
            HealWire::Keyword(keyword) if keyword == "full" => Ok(Self::Full),
            HealWire::Keyword(other) => Err(format!("unknown heal amount: {other}")),
        }
    }
}

impl From<HealAmount> for HealWire {
    fn from(amount: HealAmount) -> Self {
        match amount {
            HealAmount::Points(points) => Self::Points(points),
            HealAmount::Full => Self::Keyword("full".to_owned()),
        }
    }
}

fn one() -> u32 {
    1
}

/// A state change declared by content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    /// Sets a flag.
    SetFlag {
        /// Flag name.
        flag: String,
        /// New value.
        value: FlagValue,
    },
    /// Adds `delta` to a numeric flag.
    AdjustFlag {
        /// Flag name.
        flag: String,
        /// Amount added; may be negative.
        delta: i64,
    },
    /// Adds items to the inventory.
    GiveItem {
        /// Item id.
        item_id: String,
        /// How many.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Removes one item if carried.
    RemoveItem {
        /// Item id.
        item_id: String,
    },
    /// Adds gold.
    GiveGold {
        /// Gold pieces.
        amount: u32,
    },
    /// Heals the character.
    Heal {
        /// Points or `"full"`.
        amount: HealAmount,
    },
    /// Starts a fight.
    StartCombat(EncounterSpec),
    /// Levels the character up.
    LevelUp {
        /// Level reached.
        new_level: u32,
        /// Feats granted at the new level.
        #[serde(default)]
        feat_choices: Vec<String>,
    },
    /// Replaces the character with the default Fighter.
    CreateDefaultCharacter,
    /// Unlocks a world-map location.
    UnlockLocation {
        /// Location id.
        location_id: String,
    },
    /// Moves the party, unlocking the destination if needed.
    TravelTo {
        /// Location id.
        location_id: String,
    },
    /// Unlocks a sanctuary for safe rests.
    UnlockSanctuary {
        /// Sanctuary id.
        sanctuary_id: String,
    },
}

/// Result of [`apply_effects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEffects {
    /// World after every effect.
    pub world: WorldState,
    /// Character after every effect.
    pub character: Option<Character>,
    /// The first combat or level-up trigger raised, if any.
    pub trigger: Option<Trigger>,
}

/// Applies `effects` in order.
///
/// At most one trigger survives: later triggers are logged and dropped.
/// Effects on the character are skipped when there is none.
#[must_use]
pub fn apply_effects(
    effects: &[Effect],
    world: &WorldState,
    character: Option<&Character>,
) -> AppliedEffects {
    let mut applied = AppliedEffects {
        world: world.clone(),
        character: character.cloned(),
        trigger: None,
    };

    for effect in effects {
        debug!(?effect, "applying effect");
        let raised = match effect {
            Effect::SetFlag { flag, value } => {
                applied.world = applied.world.with_flag(flag, *value);
                None
            }
            Effect::AdjustFlag { flag, delta } => {
                applied.world = applied.world.adjust_flag(flag, *delta);
                None
            }
            Effect::GiveItem { item_id, quantity } => {
                let inventory = applied.world.inventory.with_item(item_id, *quantity);
                applied.world = applied.world.with_inventory(inventory);
                None
            }
            Effect::RemoveItem { item_id } => {
                applied.world = applied.world.remove_item(item_id);
                None
            }
            Effect::GiveGold { amount } => {
                applied.world = applied.world.give_gold(*amount);
                None
            }
            Effect::Heal { amount } => {
                applied.character = applied.character.map(|c| match amount {
                    HealAmount::Points(points) => c.heal(*points),
                    HealAmount::Full => c.heal(c.max_hp),
                });
                None
            }
            Effect::StartCombat(encounter) => Some(Trigger::Combat(encounter.clone())),
            Effect::LevelUp {
                new_level,
                feat_choices,
            } => Some(Trigger::LevelUp {
                new_level: *new_level,
                feat_choices: feat_choices.clone(),
            }),
            Effect::CreateDefaultCharacter => {
                applied.character = Some(default_character());
                None
            }
            Effect::UnlockLocation { location_id } => {
                applied.world = applied.world.unlock_location(location_id);
                None
            }
            Effect::TravelTo { location_id } => {
                let unlocked = applied.world.unlock_location(location_id);
                applied.world = match unlocked.travel_to(location_id) {
                    Ok(moved) => moved,
                    Err(_) => unlocked,
                };
                None
            }
            Effect::UnlockSanctuary { sanctuary_id } => {
                applied.world = applied.world.unlock_sanctuary(sanctuary_id);
                None
            }
        };

        if let Some(trigger) = raised {
            if applied.trigger.is_some() {
                warn!(?trigger, "second trigger in one effect list ignored");
            } else {
                applied.trigger = Some(trigger);
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heal_amount_wire_forms() {
        let effects: Vec<Effect> = serde_json::from_str(
            r#"[{"type": "heal", "amount": 5}, {"type": "heal", "amount": "full"}]"#,
        )
        .unwrap();

        assert_eq!(
            effects,
            vec![
                Effect::Heal {
                    amount: HealAmount::Points(5)
                },
                Effect::Heal {
                    amount: HealAmount::Full
                },
            ]
        );
        assert!(serde_json::from_str::<Effect>(r#"{"type": "heal", "amount": "most"}"#).is_err());
    }

    #[test]
    fn test_world_effects_apply_in_order() {
        let world = WorldState::start_campaign("ashfall", "ember_village");
        let effects = vec![
            Effect::SetFlag {
                flag: "met_elder".to_owned(),
                value: FlagValue::Bool(true),
            },
            Effect::GiveItem {
                item_id: "torch".to_owned(),
                quantity: 2,
            },
            Effect::RemoveItem {
                item_id: "torch".to_owned(),
            },
            Effect::GiveGold { amount: 12 },
            Effect::TravelTo {
                location_id: "old_mine".to_owned(),
            },
        ];

        let applied = apply_effects(&effects, &world, None);

        assert!(applied.world.is_flag_set("met_elder"));
        assert_eq!(applied.world.inventory.count("torch"), 1);
        assert_eq!(applied.world.inventory.gold, 12);
        assert_eq!(
            applied.world.current_location_id.as_deref(),
            Some("old_mine")
        );
        assert!(applied.trigger.is_none());
        assert!(!world.is_flag_set("met_elder"));
    }

    #[test]
    fn test_full_heal_restores_max_hp() {
        let wounded = default_character().with_hp(3);

        let applied = apply_effects(
            &[Effect::Heal {
                amount: HealAmount::Full,
            }],
            &WorldState::new("ashfall"),
            Some(&wounded),
        );

        assert_eq!(applied.character.unwrap().hp, 12);
    }

    #[test]
    fn test_only_first_trigger_is_kept() {
        let effects = vec![
            Effect::StartCombat(EncounterSpec::new("wolf")),
            Effect::LevelUp {
                new_level: 2,
                feat_choices: Vec::new(),
            },
        ];

        let applied = apply_effects(&effects, &WorldState::new("ashfall"), None);

        assert_eq!(
            applied.trigger,
            Some(Trigger::Combat(EncounterSpec::new("wolf")))
        );
    }

    #[test]
    fn test_create_default_character() {
        let applied = apply_effects(
            &[Effect::CreateDefaultCharacter],
            &WorldState::new("ashfall"),
            None,
        );

        assert_eq!(applied.character.unwrap().name, "Wanderer");
    }
}
