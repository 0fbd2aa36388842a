//! Cross-reference checks for campaign documents.

use std::collections::BTreeSet;
use std::fmt;

use emberfall_character::domain::{MAX_LEVEL, StatBlock};
use emberfall_combat::domain::{Bestiary, EncounterSpec};
use emberfall_core::dice::DiceExpression;
use emberfall_narrative::domain::{CampOutcome, Effect, Outcome, Requirement};
use emberfall_rules::domain::{feats, spells};
use serde::Serialize;

use super::campaign::CampaignDocument;

/// One problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIssue {
    /// Where, e.g. `node gate / choice fight`.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

struct Checker<'a> {
    node_ids: BTreeSet<&'a str>,
    table_ids: BTreeSet<&'a str>,
    bestiary: &'a Bestiary,
    issues: Vec<ContentIssue>,
}

impl Checker<'_> {
    fn report(&mut self, location: &str, message: String) {
        self.issues.push(ContentIssue {
            location: location.to_owned(),
            message,
        });
    }

    fn node(&mut self, location: &str, node_id: &str) {
        if !self.node_ids.contains(node_id) {
            self.report(location, format!("unknown node {node_id}"));
        }
    }

    fn encounter(&mut self, location: &str, encounter: &EncounterSpec) {
        if !self.bestiary.contains(&encounter.enemy_id) {
            self.report(location, format!("unknown creature {}", encounter.enemy_id));
        }
        let follow_ups = [
            encounter.on_victory_node_id.as_deref(),
            encounter.on_defeat_node_id.as_deref(),
            encounter.retreat.as_ref().map(|r| r.safe_node_id.as_str()),
        ];
        for node_id in follow_ups.into_iter().flatten() {
            self.node(location, node_id);
        }
    }

    fn outcome(&mut self, location: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Goto { node_id } => self.node(location, node_id),
            Outcome::Check {
                success, failure, ..
            } => {
                self.outcome(location, success);
                self.outcome(location, failure);
            }
            Outcome::StartCombat(encounter) => self.encounter(location, encounter),
            Outcome::Merchant(shop) => {
                for item_id in &shop.shop_inventory {
                    if !shop.buy_prices.contains_key(item_id) {
                        self.report(location, format!("{item_id} is stocked without a price"));
                    }
                }
            }
            Outcome::CharacterCreation { next_node_id, .. } => self.node(location, next_node_id),
            Outcome::Explore { table_id, .. } => {
                if !self.table_ids.contains(table_id.as_str()) {
                    self.report(location, format!("unknown event table {table_id}"));
                }
            }
            Outcome::Exit | Outcome::Loop => {}
        }
    }

    fn effects(&mut self, location: &str, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::StartCombat(encounter) => self.encounter(location, encounter),
                Effect::LevelUp {
                    new_level,
                    feat_choices,
                } => {
                    if *new_level < 2 || *new_level > MAX_LEVEL {
                        self.report(location, format!("level {new_level} is out of range"));
                    }
                    for feat_id in feat_choices {
                        if feats::feat(feat_id).is_none() {
                            self.report(location, format!("unknown feat {feat_id}"));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn requirements(&mut self, location: &str, requirements: &[Requirement]) {
        for requirement in requirements {
            if let Requirement::Visited { node_id } | Requirement::NotVisited { node_id } =
                requirement
            {
                self.node(location, node_id);
            }
        }
    }
}

/// Checks every reference in `document`. An empty result means the
/// document is playable.
#[must_use]
pub fn validate(document: &CampaignDocument, bestiary: &Bestiary) -> Vec<ContentIssue> {
    let mut checker = Checker {
        node_ids: BTreeSet::new(),
        table_ids: document.camp_tables.iter().map(|t| t.id.as_str()).collect(),
        bestiary,
        issues: Vec::new(),
    };

    for node in &document.nodes {
        if !checker.node_ids.insert(node.id.as_str()) {
            checker.report(&format!("node {}", node.id), "duplicate node id".to_owned());
        }
    }
    checker.node("campaign", &document.start_node_id);

    for node in &document.nodes {
        let here = format!("node {}", node.id);
        checker.effects(&here, &node.on_enter);
        let mut seen = BTreeSet::new();
        for choice in &node.choices {
            let location = format!("{here} / choice {}", choice.id);
            if !seen.insert(choice.id.as_str()) {
                checker.report(&location, "duplicate choice id".to_owned());
            }
            checker.requirements(&location, &choice.requirements);
            checker.outcome(&location, &choice.outcome);
        }
    }

    for table in &document.camp_tables {
        for event in &table.events {
            let here = format!("table {} / event {}", table.id, event.id);
            checker.requirements(&here, &event.requirements);
            for choice in &event.choices {
                let location = format!("{here} / choice {}", choice.id);
                checker.requirements(&location, &choice.requirements);
                match &choice.outcome {
                    CampOutcome::Continue { effects } | CampOutcome::Interrupt { effects } => {
                        checker.effects(&location, effects);
                    }
                    CampOutcome::Combat(encounter) => checker.encounter(&location, encounter),
                }
            }
        }
    }

    for creature in &document.creatures {
        let here = format!("creature {}", creature.id);
        if let Some(weapon) = &creature.equipment.weapon {
            if let Err(err) = DiceExpression::parse(&weapon.damage) {
                checker.report(&here, err.to_string());
            }
        }
        for feat_id in creature.feats() {
            if feats::feat(feat_id).is_none() {
                checker.report(&here, format!("unknown feat {feat_id}"));
            }
        }
        for spell_id in creature.spells_known() {
            if spells::spell(spell_id).is_none() {
                checker.report(&here, format!("unknown spell {spell_id}"));
            }
        }
    }

    checker.issues
}
