//! Query handlers for the Session & Progress context.
//!
//! Read-only view DTOs that a front end renders. Views are derived from a
//! [`GameSession`] and the campaign; nothing here mutates state.

use std::collections::BTreeMap;

use emberfall_character::domain::{Character, CharacterClass, StatBlock};
use emberfall_combat::domain::{CombatLogEntry, CombatPhase};
use emberfall_content::domain::Campaign;
use emberfall_core::error::DomainError;
use emberfall_narrative::domain::{ConversationEntry, Trigger};
use emberfall_rules::domain::checks::armor_class;
use emberfall_rules::domain::feats;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::session::{GameSession, Screen};

/// Number of conversation entries included in a view.
pub const CONVERSATION_TAIL: usize = 30;

/// Read-only view of a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session identifier.
    pub session_id: Uuid,
    /// Campaign id.
    pub campaign_id: String,
    /// Campaign title.
    pub campaign_title: String,
    /// Screen to render.
    pub screen: Screen,
    /// Accumulated play time.
    pub play_time_seconds: u64,
    /// The player character, once created.
    pub character: Option<CharacterView>,
    /// World summary.
    pub world: WorldView,
    /// Current node and its available choices.
    pub node: Option<NodeView>,
    /// Most recent conversation entries, oldest first.
    pub conversation: Vec<ConversationEntry>,
    /// Fight in progress.
    pub combat: Option<CombatView>,
    /// Open merchant.
    pub merchant: Option<MerchantView>,
    /// Camp or exploration event awaiting a choice.
    pub event: Option<EventView>,
    /// Pending level-up.
    pub level_up: Option<LevelUpView>,
    /// Creation step, while building a character.
    pub creation_phase: Option<String>,
}

/// Character sheet summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterView {
    /// Display name.
    pub name: String,
    /// Class.
    pub class: CharacterClass,
    /// Level.
    pub level: u32,
    /// Experience.
    pub experience: u32,
    /// Current hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Armor class including equipment and feats.
    pub armor_class: i32,
    /// Owned feats.
    pub feats: Vec<String>,
    /// Known spells.
    pub spells_known: Vec<String>,
    /// Skills with at least one rank.
    pub skills: BTreeMap<String, u32>,
}

impl CharacterView {
    fn of(character: &Character) -> Self {
        Self {
            name: character.name.clone(),
            class: character.class,
            level: character.level,
            experience: character.experience,
            hp: character.hp,
            max_hp: character.max_hp,
            armor_class: armor_class(character),
            feats: character.feats.clone(),
            spells_known: character.spells_known.clone(),
            skills: character.ranked_skills(),
        }
    }
}

/// World summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldView {
    /// Where the party is.
    pub location_id: Option<String>,
    /// Locations the party may travel to.
    pub unlocked_locations: Vec<String>,
    /// Whether resting here is safe.
    pub at_sanctuary: bool,
    /// Gold carried.
    pub gold: u32,
    /// Item counts.
    pub items: BTreeMap<String, u32>,
}

/// A selectable choice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    /// Choice id to send back.
    pub id: String,
    /// Display text.
    pub text: String,
}

/// The node waiting for a choice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    /// Node id.
    pub id: String,
    /// Narration.
    pub description: String,
    /// Speaker, if any.
    pub speaker_name: Option<String>,
    /// Choices whose requirements hold.
    pub choices: Vec<ChoiceView>,
}

/// A fight in progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatView {
    /// Engine phase.
    pub phase: CombatPhase,
    /// Turn number.
    pub turn: u32,
    /// Player hit points.
    pub player_hp: i32,
    /// Player maximum hit points.
    pub player_max_hp: i32,
    /// Consumables carried into the fight.
    pub pack: Vec<String>,
    /// Opponent name.
    pub enemy_name: String,
    /// Opponent hit points.
    pub enemy_hp: i32,
    /// Opponent maximum hit points.
    pub enemy_max_hp: i32,
    /// Whether fleeing is possible.
    pub can_retreat: bool,
    /// Combat log.
    pub log: Vec<CombatLogEntry>,
}

/// One stocked item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    /// Item id.
    pub item_id: String,
    /// Buying price.
    pub price: u32,
}

/// The open merchant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantView {
    /// Items for sale.
    pub stock: Vec<StockView>,
    /// What the merchant pays for carried items.
    pub sell_prices: BTreeMap<String, u32>,
}

/// A camp or exploration event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    /// Event id.
    pub id: String,
    /// Narration.
    pub description: String,
    /// Choices whose requirements hold.
    pub choices: Vec<ChoiceView>,
}

/// A pending level-up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpView {
    /// Level being reached.
    pub new_level: u32,
    /// Feats the story grants by default.
    pub offered_feats: Vec<String>,
    /// Feats the character could pick instead.
    pub eligible_feats: Vec<String>,
}

/// Builds the view of `session`.
///
/// # Errors
///
/// Returns `DomainError::NodeNotFound` if the session points at a node the
/// campaign does not have.
pub fn session_view(session: &GameSession, campaign: &Campaign) -> Result<SessionView, DomainError> {
    let narrative = &session.narrative;
    let world = &narrative.world;
    let character = session.character.as_ref();

    let node = match narrative.current_node_id() {
        Some(node_id) if session.screen() == Screen::Story => {
            let node = campaign.graph.node(node_id)?;
            let choices = narrative
                .available_choices(&campaign.graph, character)?
                .into_iter()
                .map(|c| ChoiceView {
                    id: c.id.clone(),
                    text: c.text.clone(),
                })
                .collect();
            Some(NodeView {
                id: node.id.clone(),
                description: node.description.clone(),
                speaker_name: node.speaker_name.clone(),
                choices,
            })
        }
        _ => None,
    };

    let combat = session.combat.as_ref().map(|combat| CombatView {
        phase: combat.phase,
        turn: combat.turn,
        player_hp: combat.player.entity.hp,
        player_max_hp: combat.player.entity.max_hp,
        pack: combat.player.entity.equipment.items.clone(),
        enemy_name: combat.enemy.entity.name.clone(),
        enemy_hp: combat.enemy.entity.hp,
        enemy_max_hp: combat.enemy.entity.max_hp,
        can_retreat: combat.encounter.allows_retreat(),
        log: combat.log.clone(),
    });

    let event = session.pending_camp_event(campaign).map(|event| EventView {
        id: event.id.clone(),
        description: event.description.clone(),
        choices: event
            .available_choices(world, character)
            .into_iter()
            .map(|c| ChoiceView {
                id: c.id.clone(),
                text: c.text.clone(),
            })
            .collect(),
    });

    let (merchant, level_up, creation_phase) = match narrative.trigger() {
        Some(Trigger::Merchant(shop)) => {
            let stock = shop
                .shop_inventory
                .iter()
                .filter_map(|id| {
                    shop.price(id).map(|price| StockView {
                        item_id: id.clone(),
                        price,
                    })
                })
                .collect();
            let sell_prices = world
                .inventory
                .items
                .keys()
                .filter_map(|id| shop.sell_price(id).map(|price| (id.clone(), price)))
                .collect();
            (Some(MerchantView { stock, sell_prices }), None, None)
        }
        Some(Trigger::LevelUp {
            new_level,
            feat_choices,
        }) => {
            let eligible_feats = character
                .map(|c| {
                    feats::eligible_feats(&c.level_up_to(*new_level, &[]))
                        .into_iter()
                        .map(|f| f.id.to_owned())
                        .collect()
                })
                .unwrap_or_default();
            let view = LevelUpView {
                new_level: *new_level,
                offered_feats: feat_choices.clone(),
                eligible_feats,
            };
            (None, Some(view), None)
        }
        Some(Trigger::CharacterCreation { phase, .. }) => (None, None, Some(phase.clone())),
        _ => (None, None, None),
    };

    let entries = &narrative.conversation.entries;
    let tail = entries.len().saturating_sub(CONVERSATION_TAIL);

    Ok(SessionView {
        session_id: session.id,
        campaign_id: campaign.id.clone(),
        campaign_title: campaign.title.clone(),
        screen: session.screen(),
        play_time_seconds: session.play_time_seconds,
        character: character.map(CharacterView::of),
        world: WorldView {
            location_id: world.current_location_id.clone(),
            unlocked_locations: world.unlocked_locations.iter().cloned().collect(),
            at_sanctuary: world.at_sanctuary(),
            gold: world.inventory.gold,
            items: world.inventory.items.clone(),
        },
        node,
        conversation: entries[tail..].to_vec(),
        combat,
        merchant,
        event,
        level_up,
        creation_phase,
    })
}
