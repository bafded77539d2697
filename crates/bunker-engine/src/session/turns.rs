//! Reveal turns, discussion, timers, round advance and game end.

use bunker_catalog::HEALTH_DECK;
use bunker_protocol::{ActionOutcome, EventKind, PlayerId};
use rand::Rng;
use tracing::info;

use super::{GameSession, RESOLUTION_AUTO_SECONDS};
use crate::model::{Phase, PlayerStatus, PostGameState, RoundRules, TimerKind, VotePhase};
use crate::settings::{ContinuePermission, RevealTimeoutAction};
use crate::GameError;

impl GameSession {
    pub(crate) fn reveal_card(&mut self, actor: &PlayerId, card_id: &str) -> Result<ActionOutcome, GameError> {
        if self.phase == Phase::Ended {
            return self.reveal_after_game(actor, card_id);
        }
        if self.phase != Phase::Reveal {
            return Err(GameError::phase("Cards cannot be revealed right now."));
        }
        if self.current_turn.as_ref() != Some(actor) {
            return Err(GameError::permission("Another player's turn."));
        }
        let player = self
            .players
            .get(actor)
            .ok_or_else(|| GameError::not_found("Player not found."))?;
        if !player.is_alive() {
            return Err(GameError::permission("You are out of the game."));
        }
        let card = player
            .hand
            .iter()
            .find(|c| c.instance_id == card_id)
            .ok_or_else(|| GameError::not_found("Card not found."))?;
        if card.revealed {
            return Err(GameError::conflict("Card already revealed."));
        }
        if let Some(forced) = self.round_rules.forced_category {
            let holds_forced = player.hand.iter().any(|c| !c.revealed && c.is_in(forced));
            if holds_forced && !card.is_in(forced) {
                return Err(GameError::precondition(format!(
                    "This round you must reveal a card of category {}.",
                    forced.label()
                )));
            }
        }

        self.flip_card(actor, card_id);
        self.revealed_this_round.insert(actor.clone());
        self.last_revealer = Some(actor.clone());
        let name = self.player_name(actor);
        let event = self.stage_event(EventKind::Info, format!("{name} revealed a card."));
        self.enter_reveal_discussion();
        Ok(ActionOutcome::changed(vec![event]))
    }

    /// Post-game reveals: anyone still in the bunker may flip their own cards
    /// until the outcome is decided.
    fn reveal_after_game(&mut self, actor: &PlayerId, card_id: &str) -> Result<ActionOutcome, GameError> {
        if !self.post_game.as_ref().is_some_and(PostGameState::accepts_reveals) {
            return Err(GameError::conflict("Game already over."));
        }
        let player = self.player_mut(actor)?;
        if player.status == PlayerStatus::LeftBunker {
            return Err(GameError::permission("You have left the game."));
        }
        let card = player
            .hand
            .iter_mut()
            .find(|c| c.instance_id == card_id)
            .ok_or_else(|| GameError::not_found("Card not found."))?;
        if card.revealed {
            return Err(GameError::conflict("Card already revealed."));
        }
        card.revealed = true;
        Ok(ActionOutcome::changed(Vec::new()))
    }

    /// Marks a hand card revealed and tracks the first health reveal.
    pub(crate) fn flip_card(&mut self, owner: &PlayerId, instance_id: &str) {
        let Some(card) = self
            .players
            .get_mut(owner)
            .and_then(|p| p.hand.iter_mut().find(|c| c.instance_id == instance_id))
        else {
            return;
        };
        card.revealed = true;
        if card.deck == HEALTH_DECK && self.first_health_revealer.is_none() {
            self.first_health_revealer = Some(owner.clone());
        }
    }

    pub(crate) fn continue_round(&mut self, actor: &PlayerId) -> Result<ActionOutcome, GameError> {
        if self.phase == Phase::Ended {
            return Err(GameError::conflict("Game already over."));
        }
        if !self.can_continue(actor) {
            return Err(GameError::permission("You may not continue right now."));
        }
        match self.phase {
            Phase::RevealDiscussion => self.advance_after_discussion(),
            Phase::Resolution => Ok(self.advance_after_resolution("end conditions reached")),
            Phase::Voting if self.vote_phase == Some(VotePhase::SpecialWindow) => self.finalize_voting(actor),
            Phase::Voting => Err(GameError::phase("Finish voting first.")),
            _ => Err(GameError::phase("Not available in the current phase.")),
        }
    }

    pub(crate) fn can_continue(&self, actor: &PlayerId) -> bool {
        match self.settings.continue_permission {
            ContinuePermission::Anyone => true,
            ContinuePermission::HostOnly => *actor == self.host_id,
            ContinuePermission::RevealerOnly if self.phase == Phase::RevealDiscussion => {
                self.last_revealer.as_ref() == Some(actor)
            }
            ContinuePermission::RevealerOnly => *actor == self.host_id,
        }
    }

    /// Resolution is over: end, open the next vote, or start the next round.
    fn advance_after_resolution(&mut self, end_reason: &str) -> ActionOutcome {
        if self.should_end() {
            return self.finish_game(end_reason);
        }
        if self.votes_remaining > 0 {
            self.start_voting();
            let event = self.event(EventKind::VotingStart, self.last_stage_text.clone());
            return ActionOutcome::changed(vec![event]);
        }
        self.start_next_round_or_end()
    }

    pub(crate) fn enter_reveal_discussion(&mut self) {
        self.clear_timer();
        self.phase = Phase::RevealDiscussion;
        self.vote_phase = None;
        let pre_vote = self.settings.enable_pre_vote_discussion_timer
            && self.votes_remaining > 0
            && self.all_alive_revealed();
        if pre_vote {
            self.arm_timer(TimerKind::PreVote, self.settings.pre_vote_discussion_seconds);
        } else if self.settings.enable_reveal_discussion_timer {
            self.arm_timer(TimerKind::RevealDiscussion, self.settings.reveal_discussion_seconds);
        }
    }

    pub(crate) fn advance_after_discussion(&mut self) -> Result<ActionOutcome, GameError> {
        if self.phase != Phase::RevealDiscussion {
            return Err(GameError::phase("Not available in the current phase."));
        }
        self.clear_timer();
        if !self.all_alive_revealed() {
            self.current_turn = self
                .next_unrevealed_alive_after(self.current_turn.as_ref())
                .or_else(|| self.first_alive());
            self.phase = Phase::Reveal;
            let event = self.stage_event(EventKind::Info, "Next reveal turn.");
            self.schedule_reveal_timeout();
            return Ok(ActionOutcome::changed(vec![event]));
        }
        if self.votes_remaining > 0 {
            self.start_voting();
            let event = self.event(EventKind::VotingStart, self.last_stage_text.clone());
            return Ok(ActionOutcome::changed(vec![event]));
        }
        Ok(self.start_next_round_or_end())
    }

    /// Arms the reveal-turn timeout when a turn is open and the timer is on.
    pub(crate) fn schedule_reveal_timeout(&mut self) {
        if self.phase == Phase::Reveal
            && self.current_turn.is_some()
            && self.settings.enable_reveal_discussion_timer
        {
            self.arm_timer(TimerKind::RevealDiscussion, self.settings.reveal_discussion_seconds);
        }
    }

    /// Runs the transition a fired timer of `kind` stands for.
    pub(crate) fn on_timer(&mut self, kind: TimerKind) -> Result<ActionOutcome, GameError> {
        match (kind, self.phase) {
            (TimerKind::RevealDiscussion, Phase::Reveal) => Ok(self.reveal_timeout()),
            (TimerKind::RevealDiscussion | TimerKind::PreVote, Phase::RevealDiscussion) => {
                self.advance_after_discussion()
            }
            (TimerKind::PostVote, Phase::Voting) if self.vote_phase == Some(VotePhase::SpecialWindow) => {
                let host = self.host_id.clone();
                self.finalize_voting(&host)
            }
            (TimerKind::ResolutionAuto, Phase::Resolution) => {
                Ok(self.advance_after_resolution("auto_after_resolution"))
            }
            _ => Ok(ActionOutcome::unchanged()),
        }
    }

    /// The current turn ran out of time.
    fn reveal_timeout(&mut self) -> ActionOutcome {
        let Some(actor) = self.current_turn.clone() else {
            return ActionOutcome::unchanged();
        };
        let Some(player) = self.players.get(&actor).filter(|p| p.is_alive()) else {
            self.current_turn = self.next_unrevealed_alive_after(Some(&actor));
            self.schedule_reveal_timeout();
            return if self.current_turn.is_some() {
                ActionOutcome::changed(Vec::new())
            } else {
                ActionOutcome::unchanged()
            };
        };
        let name = player.name.clone();
        let hidden: Vec<String> = player
            .hand
            .iter()
            .filter(|c| !c.revealed)
            .map(|c| c.instance_id.clone())
            .collect();

        if self.settings.reveal_timeout_action == RevealTimeoutAction::RandomCard && !hidden.is_empty() {
            let pick = hidden[self.rng.random_range(0..hidden.len())].clone();
            self.flip_card(&actor, &pick);
            self.revealed_this_round.insert(actor.clone());
            self.last_revealer = Some(actor);
            let event = self.stage_event(
                EventKind::Info,
                format!("Timeout: {name} revealed a card automatically."),
            );
            self.enter_reveal_discussion();
            return ActionOutcome::changed(vec![event]);
        }

        self.revealed_this_round.insert(actor.clone());
        self.last_revealer = Some(actor.clone());
        let text = format!("Timeout: {name}'s turn skipped.");

        if self.all_alive_revealed() {
            if self.votes_remaining > 0 {
                self.start_voting();
                let voting_text = self.last_stage_text.clone();
                let skipped = self.stage_event(EventKind::Info, text);
                let voting = self.event(EventKind::VotingStart, voting_text);
                return ActionOutcome::changed(vec![skipped, voting]);
            }
            let skipped = self.stage_event(EventKind::Info, text);
            let mut outcome = ActionOutcome::changed(vec![skipped]);
            outcome.merge(self.start_next_round_or_end());
            return outcome;
        }

        self.current_turn = self
            .next_unrevealed_alive_after(Some(&actor))
            .or_else(|| self.first_alive());
        self.phase = Phase::Reveal;
        let event = self.stage_event(EventKind::Info, text);
        self.schedule_reveal_timeout();
        ActionOutcome::changed(vec![event])
    }

    pub(crate) fn start_next_round_or_end(&mut self) -> ActionOutcome {
        if self.should_end() {
            return self.finish_game("end conditions reached");
        }
        if self.round + 1 > self.ruleset.rounds() {
            return self.finish_game("no rounds left");
        }

        self.round += 1;
        self.clear_timer();
        self.world_event = self.world.reveal_next_bunker(self.round);
        self.phase = Phase::Reveal;
        self.vote_phase = None;
        self.reset_vote_state();
        self.revealed_this_round.clear();
        self.current_turn = self.first_alive();
        self.votes_remaining = self.ruleset.votes_for_round(self.round);
        self.last_revealer = None;
        self.resolution_note.clear();
        self.round_rules = RoundRules::default();

        let text = format!("Round {}. Card reveal.", self.round);
        let event = self.stage_event(EventKind::RoundStart, text);
        self.schedule_reveal_timeout();
        info!(room = %self.room_code, round = self.round, votes = self.votes_remaining, "round started");
        ActionOutcome::changed(vec![event])
    }

    /// Ends the game and opens the post-game phase. A second call is a no-op.
    pub(crate) fn finish_game(&mut self, reason: &str) -> ActionOutcome {
        if self.phase == Phase::Ended && self.post_game.as_ref().is_some_and(|p| p.is_active) {
            return ActionOutcome::unchanged();
        }
        self.clear_timer();
        self.world.reveal_all_bunker(self.ruleset.rounds().max(1));
        self.phase = Phase::Ended;
        self.vote_phase = None;
        self.current_turn = None;
        self.post_game = Some(PostGameState::open(self.now()));
        self.winners = self
            .alive_ids()
            .iter()
            .map(|id| self.player_name(id))
            .collect();

        let stage = if self.winners.is_empty() {
            "Game over.".to_string()
        } else {
            format!("Game over. In the bunker: {}.", self.winners.join(", "))
        };
        self.last_stage_text = stage.clone();
        let message = if reason.is_empty() {
            stage
        } else {
            format!("{stage} ({reason})")
        };
        let event = self.event(EventKind::GameEnd, message);
        info!(room = %self.room_code, round = self.round, reason, winners = self.winners.len(), "game ended");
        ActionOutcome::changed(vec![event])
    }

    /// Arms the short pause before a resolved vote advances.
    pub(crate) fn arm_resolution_auto(&mut self) {
        self.arm_timer(TimerKind::ResolutionAuto, RESOLUTION_AUTO_SECONDS);
    }
}
