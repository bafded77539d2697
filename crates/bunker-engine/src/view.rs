//! Per-viewer snapshots of a running game.
//!
//! A view is derived from session state alone. Building one never mutates
//! the session, so rooms can rebuild views as often as they like.

use bunker_catalog::{CATEGORY_ORDER, CategoryKey, SPECIAL_CATEGORY_LABEL};
use bunker_protocol::PlayerId;
use serde::Serialize;
use serde_json::Value;

use crate::engine::RoomContext;
use crate::model::{
    BallotStatus, GamePlayer, HandCard, Phase, PlayerStatus, PostGameState, SpecialState, TimerKind, VotePhase,
};
use crate::ruleset::GameRuleset;
use crate::session::GameSession;
use crate::world::{ThreatModifier, WorldEvent, WorldState};

/// URL prefix under which card images are served.
pub const ASSET_URL_PREFIX: &str = "/assets/";

fn asset_url(asset_id: &str) -> Option<String> {
    (!asset_id.is_empty()).then(|| format!("{ASSET_URL_PREFIX}{asset_id}"))
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

// ---------------------------------------------------------------------------
// GameView
// ---------------------------------------------------------------------------

/// Everything one player is allowed to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: Phase,
    pub round: u32,
    pub category_order: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_stage_text: String,
    pub ruleset: GameRuleset,
    /// Hidden bunker and threat cards are blanked.
    pub world: WorldState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_event: Option<WorldEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_game: Option<PostGameState>,
    pub you: YouView,
    pub public: PublicView,
}

/// The viewer's own hand and abilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YouView {
    pub player_id: PlayerId,
    pub name: String,
    pub hand: Vec<CardView>,
    pub categories: Vec<YouCategorySlot>,
    pub special_conditions: Vec<SpecialView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: String,
    pub deck: String,
    pub instance_id: String,
    #[serde(rename = "labelShort")]
    pub label: String,
    #[serde(skip_serializing_if = "is_false")]
    pub missing: bool,
    pub revealed: bool,
}

impl From<&HandCard> for CardView {
    fn from(card: &HandCard) -> Self {
        Self {
            id: card.card_id.clone(),
            deck: card.deck.clone(),
            instance_id: card.instance_id.clone(),
            label: card.label.clone(),
            missing: card.missing,
            revealed: card.revealed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YouCategorySlot {
    pub category: String,
    pub cards: Vec<YouCategoryCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YouCategoryCard {
    pub instance_id: String,
    #[serde(rename = "labelShort")]
    pub label: String,
    pub revealed: bool,
}

/// An ability as its owner sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialView {
    pub instance_id: String,
    pub id: String,
    pub title: String,
    pub text: String,
    pub trigger: &'static str,
    pub effect: EffectView,
    pub implemented: bool,
    pub revealed_public: bool,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub needs_choice: bool,
    pub choice_kind: &'static str,
    #[serde(skip_serializing_if = "is_false")]
    pub allow_self_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_scope: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectView {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
}

impl From<&SpecialState> for SpecialView {
    fn from(special: &SpecialState) -> Self {
        let def = &special.definition;
        Self {
            instance_id: special.instance_id.clone(),
            id: def.id.clone(),
            title: def.title.clone(),
            text: def.text.clone(),
            trigger: def.trigger.as_str(),
            effect: EffectView {
                kind: def.effect.kind().to_string(),
                params: def.effect.params_json(),
            },
            implemented: def.implemented,
            revealed_public: special.revealed_public,
            used: special.used,
            img_url: def.asset_id.as_deref().and_then(asset_url),
            needs_choice: def.choice_kind != bunker_catalog::ChoiceKind::None,
            choice_kind: def.choice_kind.as_str(),
            allow_self_target: def.allow_self,
            target_scope: def.target_scope.map(|s| s.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public table
// ---------------------------------------------------------------------------

/// The shared table state, identical for every viewer except for the
/// viewer-specific flags `voting.hasVoted` and `canContinue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicView {
    pub players: Vec<PublicPlayerView>,
    pub revealed_this_round: Vec<PlayerId>,
    #[serde(skip_serializing_if = "is_zero")]
    pub round_revealed_count: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub round_total_alive: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn_player_id: Option<PlayerId>,
    #[serde(rename = "votesRemainingInRound")]
    pub votes_remaining: u32,
    #[serde(rename = "votesTotalThisRound")]
    pub votes_total: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub reveal_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting: Option<VotingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_phase: Option<VotePhase>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub votes_public: Vec<VotePublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting_progress: Option<VotingProgress>,
    pub threat_modifier: ThreatModifier,
    pub can_open_voting_modal: bool,
    pub can_continue: bool,
    pub vote_modal_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_timer: Option<TimerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_eliminated: Option<PlayerId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub winners: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resolution_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_rules: Option<RoundRulesView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayerView {
    pub player_id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<i64>,
    #[serde(skip_serializing_if = "is_false")]
    pub left_bunker: bool,
    pub revealed_cards: Vec<CardView>,
    pub revealed_count: usize,
    pub total_cards: usize,
    pub special_revealed: bool,
    pub categories: Vec<PublicCategorySlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Hidden,
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCategorySlot {
    pub category: String,
    pub status: SlotStatus,
    pub cards: Vec<PublicCategoryCard>,
}

impl PublicCategorySlot {
    fn new(category: &str, cards: Vec<PublicCategoryCard>) -> Self {
        let status = if cards.is_empty() { SlotStatus::Hidden } else { SlotStatus::Revealed };
        Self {
            category: category.to_string(),
            status,
            cards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCategoryCard {
    #[serde(rename = "labelShort")]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    pub revealed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingView {
    pub has_voted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VotingProgress {
    pub voted: usize,
    pub total: usize,
}

/// One ballot as shown to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePublic {
    pub voter_id: PlayerId,
    pub voter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    pub status: BallotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub kind: TimerKind,
    pub ends_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRulesView {
    #[serde(skip_serializing_if = "is_false")]
    pub no_talk_until_voting: bool,
    /// Display label of the forced category.
    #[serde(rename = "forcedRevealCategory", skip_serializing_if = "Option::is_none")]
    pub forced_category: Option<String>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

impl GameView {
    pub(crate) fn build(session: &GameSession, room: &dyn RoomContext, viewer: &PlayerId) -> Self {
        let you = match session.players.get(viewer) {
            Some(player) => YouView {
                player_id: player.id.clone(),
                name: player.name.clone(),
                hand: player.hand.iter().map(CardView::from).collect(),
                categories: you_categories(player),
                special_conditions: player.specials.iter().map(SpecialView::from).collect(),
            },
            None => YouView {
                player_id: viewer.clone(),
                name: "Unknown".to_string(),
                hand: Vec::new(),
                categories: Vec::new(),
                special_conditions: Vec::new(),
            },
        };

        let alive = session.alive_count();
        let revealed_this_round: Vec<PlayerId> = session
            .order
            .iter()
            .filter(|id| session.revealed_this_round.contains(*id))
            .cloned()
            .collect();

        let (voting, voting_progress, votes_public) = match session.vote_phase {
            Some(_) => {
                let source = session.current_vote_source();
                (
                    Some(VotingView {
                        has_voted: source.contains_key(viewer),
                    }),
                    Some(VotingProgress {
                        voted: source.len(),
                        total: alive,
                    }),
                    votes_public(session),
                )
            }
            None => (None, None, Vec::new()),
        };

        let rules = session.round_rules;
        let round_rules = (!rules.is_empty()).then(|| RoundRulesView {
            no_talk_until_voting: rules.no_talk_until_voting,
            forced_category: rules.forced_category.map(|c| c.label().to_string()),
        });

        let public = PublicView {
            players: session
                .order
                .iter()
                .filter_map(|id| session.players.get(id))
                .map(|player| public_player(session, room, player))
                .collect(),
            round_revealed_count: revealed_this_round.len(),
            revealed_this_round,
            round_total_alive: alive,
            current_turn_player_id: session.current_turn.clone(),
            votes_remaining: session.votes_remaining,
            votes_total: session.ruleset.votes_for_round(session.round),
            reveal_limit: alive,
            voting,
            vote_phase: session.vote_phase,
            votes_public,
            voting_progress,
            threat_modifier: session.world.threat_modifier(&session.threat_table),
            can_open_voting_modal: session.vote_phase.is_some(),
            can_continue: session.can_continue(viewer),
            vote_modal_open: session.vote_phase == Some(VotePhase::Voting),
            active_timer: session.active_timer.map(|t| TimerView {
                kind: t.kind,
                ends_at: t.ends_at,
            }),
            last_eliminated: session.last_eliminated.clone(),
            winners: session.winners.clone(),
            resolution_note: session.resolution_note.clone(),
            round_rules,
        };

        Self {
            phase: session.phase,
            round: session.round,
            category_order: CATEGORY_ORDER.iter().map(|c| c.to_string()).collect(),
            last_stage_text: session.last_stage_text.clone(),
            ruleset: session.ruleset.clone(),
            world: session.world.masked(),
            world_event: session.world_event,
            post_game: session.post_game.clone(),
            you,
            public,
        }
    }
}

fn you_categories(player: &GamePlayer) -> Vec<YouCategorySlot> {
    CategoryKey::DISPLAY_ORDER
        .iter()
        .map(|category| {
            let mut cards: Vec<YouCategoryCard> = player
                .hand
                .iter()
                .filter(|c| c.is_in(*category))
                .map(|c| YouCategoryCard {
                    instance_id: c.instance_id.clone(),
                    label: c.label.clone(),
                    revealed: c.revealed,
                })
                .collect();
            cards.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
            YouCategorySlot {
                category: category.label().to_string(),
                cards,
            }
        })
        .collect()
}

fn public_player(session: &GameSession, room: &dyn RoomContext, player: &GamePlayer) -> PublicPlayerView {
    let presence = room.presence(&player.id).unwrap_or_default();
    let revealed_cards: Vec<CardView> = player
        .hand
        .iter()
        .filter(|c| c.revealed)
        .map(|c| CardView {
            revealed: false,
            ..CardView::from(c)
        })
        .collect();
    PublicPlayerView {
        player_id: player.id.clone(),
        name: player.name.clone(),
        status: player.status,
        connected: presence.connected,
        disconnected_at: presence.disconnected_at,
        left_bunker: player.status == PlayerStatus::LeftBunker,
        revealed_count: revealed_cards.len(),
        revealed_cards,
        total_cards: player.hand.len(),
        special_revealed: (session.is_dev && !player.specials.is_empty()) || player.has_revealed_special(),
        categories: public_categories(session.is_dev, player),
    }
}

/// Category slots as the table sees them. The sandbox shows every card.
fn public_categories(show_all: bool, player: &GamePlayer) -> Vec<PublicCategorySlot> {
    let mut slots: Vec<PublicCategorySlot> = CategoryKey::DISPLAY_ORDER
        .iter()
        .map(|category| {
            let cards = player
                .hand
                .iter()
                .filter(|c| c.is_in(*category) && (show_all || c.revealed))
                .map(|c| PublicCategoryCard {
                    label: c.label.clone(),
                    img_url: asset_url(&c.card_id),
                    revealed: c.revealed,
                })
                .collect();
            PublicCategorySlot::new(category.label(), cards)
        })
        .collect();

    let specials = player
        .specials
        .iter()
        .filter(|s| show_all || s.revealed_public)
        .map(|s| PublicCategoryCard {
            label: s.definition.title.clone(),
            img_url: s.definition.asset_id.as_deref().and_then(asset_url),
            revealed: s.revealed_public,
        })
        .collect();
    slots.push(PublicCategorySlot::new(SPECIAL_CATEGORY_LABEL, specials));
    slots
}

fn votes_public(session: &GameSession) -> Vec<VotePublic> {
    session
        .effective_votes(session.current_vote_source())
        .into_iter()
        .map(|(voter, vote)| {
            let voter_name = session.player_name(&voter);
            match (vote.status, vote.target) {
                (BallotStatus::Voted, Some(target)) => VotePublic {
                    voter_id: voter,
                    voter_name,
                    target_name: Some(
                        session
                            .players
                            .get(&target)
                            .map_or_else(|| "Unknown player".to_string(), |p| p.name.clone()),
                    ),
                    target_id: Some(target),
                    status: BallotStatus::Voted,
                    reason: None,
                    submitted_at: vote.submitted_at,
                },
                (BallotStatus::NotVoted, _) => VotePublic {
                    voter_id: voter,
                    voter_name,
                    target_id: None,
                    target_name: None,
                    status: BallotStatus::NotVoted,
                    reason: None,
                    submitted_at: None,
                },
                _ => VotePublic {
                    voter_id: voter,
                    voter_name,
                    target_id: None,
                    target_name: None,
                    status: BallotStatus::Invalid,
                    reason: Some(vote.reason.unwrap_or_else(|| "Vote rejected.".to_string())),
                    submitted_at: vote.submitted_at,
                },
            }
        })
        .collect()
}
