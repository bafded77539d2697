//! The sandbox scenario: a [`GameSession`] with bots that play themselves.
//!
//! `DevTestSession` holds a core session and forwards to it. After every
//! successful call it runs bot moves until the table stops changing, then
//! applies its own, smaller end condition.

use bunker_protocol::{ActionOutcome, GameAction, PlayerId};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::engine::{GameEngine, RoomContext};
use crate::model::{ArmedTimer, Phase, PlayerStatus, VotePhase, VoteRecord};
use crate::session::GameSession;
use crate::settings::Scenario;
use crate::view::GameView;
use crate::GameError;

/// The sandbox ends once this few players remain after any elimination.
pub const DEV_BUNKER_CAPACITY: usize = 5;

const NO_CANDIDATE_REASON: &str = "No candidates available.";

#[derive(Debug)]
pub struct DevTestSession {
    core: GameSession,
}

impl DevTestSession {
    pub fn new(core: GameSession) -> Self {
        Self { core }
    }

    /// The wrapped session.
    pub fn core(&self) -> &GameSession {
        &self.core
    }

    fn route(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError> {
        match action {
            GameAction::DevKickPlayer { .. } => Err(GameError::unsupported("Unknown action.")),
            GameAction::DevSkipRound => self.skip_round(actor),
            GameAction::MarkLeftBunker { target_player_id } => self.mark_left_bunker(target_player_id.as_ref()),
            action @ (GameAction::SetBunkerOutcome { .. }
            | GameAction::DevAddPlayer { .. }
            | GameAction::DevRemovePlayer { .. }
            | GameAction::RevealWorldThreat { .. }) => self.core.apply_action(actor, action),
            action => {
                match self.core.status_of(actor) {
                    None => return Err(GameError::not_found("Player not found.")),
                    Some(PlayerStatus::Alive) => {}
                    Some(_) => return Err(GameError::permission("You are out of the game.")),
                }
                if self.core.phase == Phase::Ended {
                    return Err(GameError::conflict("Game already over."));
                }
                if matches!(action, GameAction::FinalizeVoting)
                    && self.core.vote_phase != Some(VotePhase::SpecialWindow)
                {
                    return Err(GameError::phase("The ability window is not open yet."));
                }
                self.core.apply_action(actor, action)
            }
        }
    }

    /// Host only. Counts everyone as revealed and moves on.
    fn skip_round(&mut self, actor: &PlayerId) -> Result<ActionOutcome, GameError> {
        if actor != &self.core.host_id {
            return Err(GameError::permission("Only the host can skip a round."));
        }
        match self.core.phase {
            Phase::Voting | Phase::Resolution => {
                return Err(GameError::phase("A round cannot be skipped during voting."));
            }
            Phase::Ended => return Err(GameError::conflict("Game already over.")),
            Phase::Reveal | Phase::RevealDiscussion => {}
        }
        for id in self.core.alive_ids() {
            self.core.revealed_this_round.insert(id);
        }
        self.core.phase = Phase::RevealDiscussion;
        debug!(room = %self.core.room_code, round = self.core.round, "round skipped");
        self.core.advance_after_discussion()
    }

    /// Status change only: no exile is counted and no vote is consumed.
    fn mark_left_bunker(&mut self, target: Option<&PlayerId>) -> Result<ActionOutcome, GameError> {
        let target = target
            .filter(|t| !t.is_blank())
            .filter(|t| self.core.status_of(t).is_some_and(|s| s != PlayerStatus::LeftBunker))
            .cloned()
            .ok_or_else(|| GameError::not_found("Player not found."))?;

        self.core.player_mut(&target)?.status = PlayerStatus::LeftBunker;
        self.core.revealed_this_round.remove(&target);
        let mut outcome = ActionOutcome::changed(Vec::new());
        outcome.merge(self.remove_from_voting(&target));

        if self.core.current_turn.as_ref() == Some(&target) {
            self.core.current_turn = self
                .core
                .next_unrevealed_alive_after(Some(&target))
                .or_else(|| self.core.first_alive());
        }
        info!(room = %self.core.room_code, player = %target, "player left the bunker");
        Ok(outcome)
    }

    /// Drops `id` from the vote and opens the ability window if everyone
    /// left has now voted.
    fn remove_from_voting(&mut self, id: &PlayerId) -> ActionOutcome {
        self.core.remove_from_voting(id);
        let alive = self.core.alive_count();
        if self.core.phase == Phase::Voting
            && self.core.vote_phase == Some(VotePhase::Voting)
            && alive > 0
            && self.core.votes.len() >= alive
        {
            return self.core.enter_vote_special_window();
        }
        ActionOutcome::unchanged()
    }

    // -----------------------------------------------------------------------
    // Bots
    // -----------------------------------------------------------------------

    /// Runs bot moves to a fixed point, then checks the sandbox end rule.
    fn post_process(&mut self, mut outcome: ActionOutcome) -> ActionOutcome {
        loop {
            let mut triggered = false;
            if self.core.phase == Phase::Reveal {
                let step = self.auto_reveal();
                triggered |= step.state_changed;
                outcome.merge(step);
            }
            if self.core.phase == Phase::Voting && self.core.vote_phase == Some(VotePhase::Voting) {
                let step = self.auto_vote();
                triggered |= step.state_changed;
                outcome.merge(step);
            }
            if !triggered {
                break;
            }
        }

        if self.should_end() {
            outcome.merge(self.core.finish_game("dev_test_bunker_capacity"));
        }
        outcome
    }

    fn should_end(&self) -> bool {
        self.core.phase != Phase::Ended
            && self.core.last_eliminated.is_some()
            && self.core.alive_count() <= DEV_BUNKER_CAPACITY
    }

    /// Reveals a card for the bot whose turn it is, preferring the forced
    /// category of the round.
    fn auto_reveal(&mut self) -> ActionOutcome {
        let Some(current) = self.core.current_turn.clone() else {
            return ActionOutcome::unchanged();
        };
        let Some(player) = self.core.players.get(&current).filter(|p| p.is_alive() && p.is_bot) else {
            return ActionOutcome::unchanged();
        };
        let forced = self.core.round_rules.forced_category;
        let card = forced
            .and_then(|category| player.hand.iter().find(|c| !c.revealed && c.is_in(category)))
            .or_else(|| player.hand.iter().find(|c| !c.revealed))
            .map(|c| c.instance_id.clone());
        let Some(card) = card else {
            return ActionOutcome::unchanged();
        };
        match self.core.reveal_card(&current, &card) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(room = %self.core.room_code, player = %current, error = %err, "bot reveal failed");
                ActionOutcome::unchanged()
            }
        }
    }

    /// Casts a ballot for every bot that has none: a uniformly random
    /// viable candidate, or a wasted vote if there is none or the bot is
    /// blocked.
    fn auto_vote(&mut self) -> ActionOutcome {
        let alive = self.core.alive_count();
        if alive == 0 {
            return ActionOutcome::unchanged();
        }

        let bots: Vec<PlayerId> = self
            .core
            .order
            .iter()
            .filter(|id| self.core.players.get(*id).is_some_and(|p| p.is_alive() && p.is_bot))
            .filter(|id| !self.core.votes.contains_key(*id))
            .cloned()
            .collect();
        if bots.is_empty() {
            return ActionOutcome::unchanged();
        }

        for voter in bots {
            if let Some(reason) = self.core.vote_disabled.get(&voter).cloned() {
                self.core.mark_vote_wasted(&voter, &reason);
                continue;
            }
            let viable: Vec<PlayerId> = self
                .core
                .vote_candidates
                .iter()
                .filter(|candidate| **candidate != voter && !self.core.revote_disallow.contains(*candidate))
                .filter(|candidate| {
                    self.core
                        .players
                        .get(*candidate)
                        .is_some_and(|p| p.is_alive() && !p.banned_against.contains(&voter))
                })
                .cloned()
                .collect();
            if viable.is_empty() {
                self.core.mark_vote_wasted(&voter, NO_CANDIDATE_REASON);
                continue;
            }
            let target = viable[self.core.rng.random_range(0..viable.len())].clone();
            let record = VoteRecord {
                target: Some(target),
                submitted_at: self.core.now(),
                is_valid: true,
                reason: None,
            };
            self.core.votes.insert(voter, record);
        }

        let mut outcome = ActionOutcome::changed(Vec::new());
        if self.core.votes.len() >= alive {
            outcome.merge(self.core.enter_vote_special_window());
        }
        outcome
    }
}

impl GameEngine for DevTestSession {
    fn handle_action(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError> {
        let outcome = self.route(actor, action)?;
        Ok(self.post_process(outcome))
    }

    fn handle_timer_expired(&mut self, now_ms: i64, version: u64) -> Result<ActionOutcome, GameError> {
        let outcome = self.core.expire_timer(now_ms, version)?;
        Ok(self.post_process(outcome))
    }

    fn build_game_view(&self, room: &dyn RoomContext, viewer: &PlayerId) -> GameView {
        GameView::build(&self.core, room, viewer)
    }

    fn current_timer(&self) -> Option<ArmedTimer> {
        self.core.active_timer
    }

    fn set_host_id(&mut self, host: PlayerId) {
        GameEngine::set_host_id(&mut self.core, host);
    }

    fn player_status(&self, player: &PlayerId) -> Option<PlayerStatus> {
        self.core.status_of(player)
    }

    fn phase(&self) -> Phase {
        self.core.phase
    }

    fn scenario(&self) -> Scenario {
        Scenario::DevTest
    }
}
