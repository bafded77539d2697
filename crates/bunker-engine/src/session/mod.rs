//! The classic game session: one per running game, owned by its room.
//!
//! `GameSession` is a plain state machine. Every entry point takes
//! `&mut self`, validates, and either mutates and returns the events that
//! describe the change or returns a [`GameError`] without touching state.
//! Turn flow lives in `turns`, vote collection and counting in `voting`,
//! abilities in `specials` and host/admin actions in `admin`.

mod admin;
mod specials;
mod turns;
mod voting;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bunker_catalog::{
    BIOLOGY_DECK, CORE_DECKS, DeckPools, FACTS_DECK, FactSlot, SpecialAssetIndex, SpecialDefinition,
    SpecialEffect, builtin_definitions,
};
use bunker_protocol::{ActionOutcome, EventKind, GameAction, GameEvent, PlayerId, RoomCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::{GameEngine, RoomContext, SessionSetup};
use crate::model::{
    ArmedTimer, GamePlayer, HandCard, MISSING_CARD_LABEL, Phase, PlayerStatus, PostGameState,
    RoundRules, TimerKind, VotePhase, VoteRecord,
};
use crate::ruleset::GameRuleset;
use crate::settings::{GameSettings, Scenario};
use crate::view::GameView;
use crate::world::{ThreatModifierTable, WorldEvent, WorldState};
use crate::GameError;

/// Delay before a resolved vote advances on its own.
pub(crate) const RESOLUTION_AUTO_SECONDS: u32 = 2;

/// A running game.
pub struct GameSession {
    pub(crate) room_code: RoomCode,
    pub(crate) host_id: PlayerId,
    pub(crate) scenario: Scenario,
    pub(crate) is_dev: bool,
    pub(crate) settings: GameSettings,
    pub(crate) ruleset: GameRuleset,

    pub(crate) players: BTreeMap<PlayerId, GamePlayer>,
    /// Seating order; fixed except for dev additions and removals.
    pub(crate) order: Vec<PlayerId>,

    pub(crate) phase: Phase,
    pub(crate) round: u32,
    pub(crate) current_turn: Option<PlayerId>,
    pub(crate) revealed_this_round: BTreeSet<PlayerId>,
    pub(crate) last_revealer: Option<PlayerId>,

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------
    pub(crate) vote_phase: Option<VotePhase>,
    pub(crate) votes: BTreeMap<PlayerId, VoteRecord>,
    /// Snapshot taken when the special window opens.
    pub(crate) base_votes: BTreeMap<PlayerId, VoteRecord>,
    /// The ballots a finalized vote was counted from.
    pub(crate) vote_results: BTreeMap<PlayerId, VoteRecord>,
    pub(crate) vote_candidates: BTreeSet<PlayerId>,
    /// Voters whose ballot is void for the current vote, with the reason.
    pub(crate) vote_disabled: BTreeMap<PlayerId, String>,
    pub(crate) vote_weights: BTreeMap<PlayerId, i64>,
    /// Voters whose ballot was wasted by force; re-marked after a revote reset.
    pub(crate) auto_wasted: BTreeSet<PlayerId>,
    pub(crate) revote_disallow: BTreeSet<PlayerId>,
    pub(crate) double_against: Option<PlayerId>,
    pub(crate) tie_break_used: bool,
    pub(crate) votes_remaining: u32,
    pub(crate) total_exiles: u32,
    pub(crate) last_eliminated: Option<PlayerId>,

    pub(crate) resolution_note: String,
    pub(crate) winners: Vec<String>,
    pub(crate) last_stage_text: String,

    pub(crate) world: WorldState,
    pub(crate) world_event: Option<WorldEvent>,
    pub(crate) threat_table: ThreatModifierTable,
    pub(crate) post_game: Option<PostGameState>,
    pub(crate) final_threats: Vec<String>,
    pub(crate) first_health_revealer: Option<PlayerId>,
    pub(crate) round_rules: RoundRules,

    pub(crate) active_timer: Option<ArmedTimer>,
    timer_version: u64,

    // -----------------------------------------------------------------------
    // Cards and abilities
    // -----------------------------------------------------------------------
    pub(crate) pools: DeckPools,
    card_counter: u64,
    special_counter: u64,
    pub(crate) dev_bot_counter: u64,
    event_counter: u64,
    pub(crate) special_pool: Vec<SpecialDefinition>,
    pub(crate) special_assets: SpecialAssetIndex,
    pub(crate) dev_choice_template: Option<SpecialDefinition>,

    pub(crate) rng: StdRng,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("room_code", &self.room_code)
            .field("scenario", &self.scenario)
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("vote_phase", &self.vote_phase)
            .field("players", &self.order)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Deals a new game and opens round 1.
    pub fn new(setup: SessionSetup<'_>) -> Self {
        let seed = match setup.seed {
            0 => rand::rng().random::<u64>(),
            seed => seed,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pools = setup.assets.pools();
        let player_count = setup.players.len();
        let world = WorldState::roll(&mut pools, &mut rng, player_count);
        let ruleset = setup
            .ruleset
            .unwrap_or_else(|| GameRuleset::auto(player_count as u32));

        let mut special_pool = setup.abilities.working_copy();
        if special_pool.is_empty() {
            special_pool = builtin_definitions();
        }
        let special_assets = SpecialAssetIndex::build(&pools);
        let is_dev = setup.scenario.is_dev();
        let dev_choice_template = is_dev
            .then(|| {
                setup
                    .abilities
                    .find_by_effect_kind("forceRevealCategoryForAll")
                    .cloned()
                    .or_else(|| {
                        builtin_definitions()
                            .into_iter()
                            .find(|d| matches!(d.effect, SpecialEffect::ForceRevealCategoryForAll(_)))
                    })
            })
            .flatten();

        let mut session = Self {
            room_code: setup.room_code,
            host_id: setup.host_id,
            scenario: setup.scenario,
            is_dev,
            settings: setup.settings,
            ruleset,
            players: BTreeMap::new(),
            order: Vec::new(),
            phase: Phase::Reveal,
            round: 1,
            current_turn: None,
            revealed_this_round: BTreeSet::new(),
            last_revealer: None,
            vote_phase: None,
            votes: BTreeMap::new(),
            base_votes: BTreeMap::new(),
            vote_results: BTreeMap::new(),
            vote_candidates: BTreeSet::new(),
            vote_disabled: BTreeMap::new(),
            vote_weights: BTreeMap::new(),
            auto_wasted: BTreeSet::new(),
            revote_disallow: BTreeSet::new(),
            double_against: None,
            tie_break_used: false,
            votes_remaining: 0,
            total_exiles: 0,
            last_eliminated: None,
            resolution_note: String::new(),
            winners: Vec::new(),
            last_stage_text: String::new(),
            world,
            world_event: None,
            threat_table: setup.threat_table,
            post_game: None,
            final_threats: Vec::new(),
            first_health_revealer: None,
            round_rules: RoundRules::default(),
            active_timer: None,
            timer_version: 0,
            pools,
            card_counter: 0,
            special_counter: 0,
            dev_bot_counter: 0,
            event_counter: 0,
            special_pool,
            special_assets,
            dev_choice_template,
            rng,
            clock: setup.clock,
        };

        for seat in setup.players {
            if session.players.contains_key(&seat.id) {
                continue;
            }
            session.seat_player(seat.id, seat.name, false);
        }
        for id in session.order.clone() {
            session.deal_specials(&id);
        }

        session.current_turn = session.first_alive();
        session.votes_remaining = session.ruleset.votes_for_round(1);
        session.world_event = session.world.reveal_next_bunker(1);
        session.last_stage_text = "Round 1. Card reveal.".to_string();
        session.schedule_reveal_timeout();

        info!(
            room = %session.room_code,
            scenario = %session.scenario,
            players = session.order.len(),
            seed,
            "game session started"
        );
        session
    }

    /// Applies one action. Errors leave the session untouched.
    pub fn apply_action(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError> {
        if !self.players.contains_key(actor) {
            return Err(GameError::not_found("Player not found."));
        }
        let name = action.name();
        let result = self.dispatch(actor, action);
        if let Err(err) = &result {
            debug!(room = %self.room_code, player = %actor, action = name, kind = %err.kind(), error = %err, "action rejected");
        }
        result
    }

    fn dispatch(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError> {
        match action {
            GameAction::RevealCard { card_id } => self.reveal_card(actor, &card_id),
            GameAction::ContinueRound => self.continue_round(actor),
            GameAction::Vote { target_player_id } => self.vote(actor, &target_player_id),
            GameAction::FinalizeVoting => self.finalize_voting(actor),
            GameAction::ApplySpecial {
                special_instance_id,
                payload,
            } => self.apply_special(actor, &special_instance_id, &payload),
            GameAction::RevealWorldThreat { index } => self.reveal_world_threat(actor, index),
            GameAction::SetBunkerOutcome { outcome } => self.set_bunker_outcome(actor, outcome),
            // No phase guard at this level: the sandbox wrapper refuses it
            // mid-vote and rooms accept it from the host only.
            GameAction::DevSkipRound => Ok(self.start_next_round_or_end()),
            GameAction::DevKickPlayer { target_player_id } => self.kick_player(target_player_id.as_ref()),
            GameAction::DevAddPlayer { name } => self.dev_add_player(name.as_deref()),
            GameAction::DevRemovePlayer { target_player_id } => self.dev_remove_player(target_player_id.as_ref()),
            GameAction::MarkLeftBunker { target_player_id } => self.mark_left_bunker(target_player_id.as_ref()),
        }
    }

    /// Fires the armed timer if `version` is current and its deadline passed.
    pub fn expire_timer(&mut self, now_ms: i64, version: u64) -> Result<ActionOutcome, GameError> {
        let Some(timer) = self.active_timer else {
            return Ok(ActionOutcome::unchanged());
        };
        if timer.version != version || now_ms < timer.ends_at {
            debug!(room = %self.room_code, kind = %timer.kind, version, "ignoring stale timer");
            return Ok(ActionOutcome::unchanged());
        }
        self.clear_timer();
        self.on_timer(timer.kind)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn vote_phase(&self) -> Option<VotePhase> {
        self.vote_phase
    }

    pub fn current_turn(&self) -> Option<&PlayerId> {
        self.current_turn.as_ref()
    }

    pub fn ruleset(&self) -> &GameRuleset {
        &self.ruleset
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn player(&self, id: &PlayerId) -> Option<&GamePlayer> {
        self.players.get(id)
    }

    /// Players in seating order.
    pub fn players(&self) -> impl Iterator<Item = &GamePlayer> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn votes_remaining(&self) -> u32 {
        self.votes_remaining
    }

    pub fn total_exiles(&self) -> u32 {
        self.total_exiles
    }

    pub fn winners(&self) -> &[String] {
        &self.winners
    }

    pub fn final_threats(&self) -> &[String] {
        &self.final_threats
    }

    pub fn post_game(&self) -> Option<&PostGameState> {
        self.post_game.as_ref()
    }

    pub fn round_rules(&self) -> RoundRules {
        self.round_rules
    }

    pub fn last_stage_text(&self) -> &str {
        &self.last_stage_text
    }

    pub fn has_revealed_this_round(&self, id: &PlayerId) -> bool {
        self.revealed_this_round.contains(id)
    }

    /// Effective totals per candidate for the ballots that count right now,
    /// after weights, doubling and voided ballots.
    pub fn vote_tally(&self) -> BTreeMap<PlayerId, i64> {
        self.vote_totals(self.current_vote_source()).0
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub(crate) fn event(&mut self, kind: EventKind, message: impl Into<String>) -> GameEvent {
        self.event_counter += 1;
        GameEvent {
            id: format!("{}-{}", self.room_code, self.event_counter),
            kind,
            message: message.into(),
            created_at: self.now(),
        }
    }

    /// Sets the stage text and returns it as an event of `kind`.
    pub(crate) fn stage_event(&mut self, kind: EventKind, text: impl Into<String>) -> GameEvent {
        self.last_stage_text = text.into();
        let text = self.last_stage_text.clone();
        self.event(kind, text)
    }

    pub(crate) fn player_name(&self, id: &PlayerId) -> String {
        self.players
            .get(id)
            .map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    pub(crate) fn is_alive(&self, id: &PlayerId) -> bool {
        self.players.get(id).is_some_and(GamePlayer::is_alive)
    }

    pub(crate) fn alive_ids(&self) -> Vec<PlayerId> {
        self.order
            .iter()
            .filter(|id| self.is_alive(id))
            .cloned()
            .collect()
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.order.iter().filter(|id| self.is_alive(id)).count()
    }

    pub(crate) fn first_alive(&self) -> Option<PlayerId> {
        self.order.iter().find(|id| self.is_alive(id)).cloned()
    }

    /// Circular scan of the seating order for the next alive player who has
    /// not revealed this round, starting after `current`.
    pub(crate) fn next_unrevealed_alive_after(&self, current: Option<&PlayerId>) -> Option<PlayerId> {
        let len = self.order.len();
        if len == 0 {
            return None;
        }
        let start = current
            .and_then(|c| self.order.iter().position(|id| id == c))
            .map_or(0, |i| i + 1);
        (0..len)
            .map(|step| &self.order[(start + step) % len])
            .find(|id| self.is_alive(id) && !self.revealed_this_round.contains(*id))
            .cloned()
    }

    pub(crate) fn all_alive_revealed(&self) -> bool {
        self.order
            .iter()
            .filter(|id| self.is_alive(id))
            .all(|id| self.revealed_this_round.contains(id))
    }

    /// Nearest alive players left and right of `id` in seating order.
    ///
    /// `include` counts as alive even if it no longer is, so triggers can
    /// look at a player at the moment of their elimination.
    pub(crate) fn neighbor_ids(&self, id: &PlayerId, include: Option<&PlayerId>) -> (Option<PlayerId>, Option<PlayerId>) {
        let len = self.order.len();
        let Some(index) = self.order.iter().position(|p| p == id) else {
            return (None, None);
        };
        let eligible = |candidate: &PlayerId| {
            candidate != id && (self.is_alive(candidate) || include == Some(candidate))
        };
        let left = (1..len)
            .map(|step| &self.order[(index + len - step) % len])
            .find(|c| eligible(*c))
            .cloned();
        let right = (1..len)
            .map(|step| &self.order[(index + step) % len])
            .find(|c| eligible(*c))
            .cloned();
        (left, right)
    }

    pub(crate) fn should_end(&self) -> bool {
        self.alive_count() <= self.ruleset.bunker_seats as usize
            || self.total_exiles >= self.ruleset.total_exiles
    }

    pub(crate) fn clear_timer(&mut self) {
        self.active_timer = None;
    }

    /// Arms the single session timer, superseding any earlier one.
    pub(crate) fn arm_timer(&mut self, kind: TimerKind, seconds: u32) {
        if seconds == 0 {
            return;
        }
        self.timer_version += 1;
        let ends_at = self.now() + i64::from(seconds) * 1_000;
        self.active_timer = Some(ArmedTimer {
            kind,
            ends_at,
            version: self.timer_version,
        });
        debug!(room = %self.room_code, kind = %kind, ends_at, version = self.timer_version, "timer armed");
    }

    /// After `removed` stops taking turns, hands the turn on if it was theirs.
    pub(crate) fn repair_turn(&mut self, removed: &PlayerId) {
        if self.current_turn.as_ref() != Some(removed) {
            return;
        }
        self.current_turn = self.next_unrevealed_alive_after(Some(removed));
        if self.phase != Phase::Reveal {
            return;
        }
        if self.current_turn.is_some() {
            self.schedule_reveal_timeout();
        } else {
            self.enter_reveal_discussion();
        }
    }

    /// Age from the first revealed biology card: the first run of one to
    /// three digits, if it lies in 1..=120.
    pub(crate) fn revealed_age(&self, id: &PlayerId) -> Option<u32> {
        let card = self
            .players
            .get(id)?
            .hand
            .iter()
            .find(|c| c.deck == BIOLOGY_DECK && c.revealed)?;
        parse_age(&card.label)
    }

    /// Youngest and oldest alive players by revealed age, first in order on
    /// ties. `include` is counted even if no longer alive.
    pub(crate) fn age_extremes(&self, include: Option<&PlayerId>) -> Option<(PlayerId, PlayerId)> {
        let mut youngest: Option<(u32, &PlayerId)> = None;
        let mut oldest: Option<(u32, &PlayerId)> = None;
        for id in &self.order {
            if !self.is_alive(id) && include != Some(id) {
                continue;
            }
            let Some(age) = self.revealed_age(id) else {
                continue;
            };
            if youngest.is_none_or(|(a, _)| age < a) {
                youngest = Some((age, id));
            }
            if oldest.is_none_or(|(a, _)| age > a) {
                oldest = Some((age, id));
            }
        }
        Some((youngest?.1.clone(), oldest?.1.clone()))
    }

    // -----------------------------------------------------------------------
    // Dealing
    // -----------------------------------------------------------------------

    fn seat_player(&mut self, id: PlayerId, name: String, is_bot: bool) {
        let mut player = GamePlayer::new(id.clone(), name);
        player.is_bot = is_bot;
        player.hand = self.deal_hand(&id);
        self.players.insert(id.clone(), player);
        self.order.push(id);
    }

    fn deal_hand(&mut self, owner: &PlayerId) -> Vec<HandCard> {
        let slots = CORE_DECKS
            .iter()
            .map(|deck| (*deck, None))
            .chain(FactSlot::ALL.iter().map(|slot| (FACTS_DECK, Some(*slot))));
        slots
            .map(|(deck, slot)| {
                let instance_id = self.next_card_instance_id(owner);
                match self.pools.draw(deck, &mut self.rng) {
                    Some(card) => HandCard {
                        instance_id,
                        card_id: card.id,
                        deck: deck.to_string(),
                        slot,
                        label: card.label,
                        revealed: false,
                        missing: false,
                    },
                    None => HandCard {
                        instance_id,
                        card_id: String::new(),
                        deck: deck.to_string(),
                        slot,
                        label: MISSING_CARD_LABEL.to_string(),
                        revealed: false,
                        missing: true,
                    },
                }
            })
            .collect()
    }

    pub(crate) fn next_card_instance_id(&mut self, owner: &PlayerId) -> String {
        self.card_counter += 1;
        format!("{owner}-{}", self.card_counter)
    }

    pub(crate) fn next_special_instance_id(&mut self, owner: &PlayerId) -> String {
        self.special_counter += 1;
        format!("special-{owner}-{}", self.special_counter)
    }

    pub(crate) fn player_mut(&mut self, id: &PlayerId) -> Result<&mut GamePlayer, GameError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| GameError::not_found("Player not found."))
    }

    pub(crate) fn status_of(&self, id: &PlayerId) -> Option<PlayerStatus> {
        self.players.get(id).map(|p| p.status)
    }
}

fn parse_age(label: &str) -> Option<u32> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits: String = label[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.len() > 3 {
        return None;
    }
    digits.parse().ok().filter(|age| (1..=120).contains(age))
}

impl GameEngine for GameSession {
    fn handle_action(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError> {
        self.apply_action(actor, action)
    }

    fn handle_timer_expired(&mut self, now_ms: i64, version: u64) -> Result<ActionOutcome, GameError> {
        self.expire_timer(now_ms, version)
    }

    fn build_game_view(&self, room: &dyn RoomContext, viewer: &PlayerId) -> GameView {
        GameView::build(self, room, viewer)
    }

    fn current_timer(&self) -> Option<ArmedTimer> {
        self.active_timer
    }

    fn set_host_id(&mut self, host: PlayerId) {
        info!(room = %self.room_code, host = %host, "host changed");
        self.host_id = host;
    }

    fn player_status(&self, player: &PlayerId) -> Option<PlayerStatus> {
        self.status_of(player)
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn scenario(&self) -> Scenario {
        self.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("Мужчина, 34 года"), Some(34));
        assert_eq!(parse_age("Женщина 120 лет"), Some(120));
        assert_eq!(parse_age("Возраст 0"), None);
        assert_eq!(parse_age("1999 год"), None);
        assert_eq!(parse_age("без возраста"), None);
        assert_eq!(parse_age("7 лет, рост 180"), Some(7));
    }
}
