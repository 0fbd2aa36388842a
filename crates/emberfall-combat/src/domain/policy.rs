//! Enemy turn policy.
//!
//! The enemy uses the first attack feat it can afford, else the first
//! offensive spell it can cast, else a plain weapon attack.

use emberfall_character::domain::{ResourceRef, StatBlock};
use emberfall_rules::domain::conditions::{Condition, aggregate};
use emberfall_rules::domain::feats::{self, FeatKind};
use emberfall_rules::domain::spells;
use serde::{Deserialize, Serialize};

/// What the enemy does on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum EnemyAction {
    /// A weapon attack, optionally through an attack feat.
    Attack {
        /// Attack feat to apply.
        feat_id: Option<String>,
    },
    /// An offensive spell.
    CastSpell {
        /// Spell id.
        spell_id: String,
    },
}

/// Picks the enemy's action.
#[must_use]
pub fn choose_action<E: StatBlock>(enemy: &E, conditions: &[Condition]) -> EnemyAction {
    let ledger = enemy.resources();

    let affordable_feat = enemy.feats().iter().find(|id| {
        feats::feat(id).is_some_and(|f| {
            f.kind == FeatKind::AttackVariant
                && f
                    .effect
                    .resource_cost
                    .is_none_or(|cost| ledger.can_spend(&ResourceRef::Ability(cost.to_owned())))
        })
    });
    if let Some(feat_id) = affordable_feat {
        return EnemyAction::Attack {
            feat_id: Some(feat_id.clone()),
        };
    }

    if !aggregate(conditions).prevents_spellcasting {
        let castable = enemy.spells_known().iter().find(|id| {
            spells::spell(id).is_some_and(|s| {
                s.is_offensive() && s.slot().is_none_or(|slot| ledger.can_spend(&slot))
            })
        });
        if let Some(spell_id) = castable {
            return EnemyAction::CastSpell {
                spell_id: spell_id.clone(),
            };
        }
    }

    EnemyAction::Attack { feat_id: None }
}
