//! Host and sandbox actions: removals, departures and the post-game.

use bunker_protocol::{ActionOutcome, BunkerOutcome, EventKind, PlayerId};
use tracing::info;

use super::GameSession;
use crate::model::{Phase, PlayerStatus, VotePhase};
use crate::settings::FinalThreatReveal;
use crate::GameError;

impl GameSession {
    /// Eliminates an alive player outside of a vote.
    pub(crate) fn kick_player(&mut self, target: Option<&PlayerId>) -> Result<ActionOutcome, GameError> {
        let target = target
            .filter(|t| !t.is_blank())
            .ok_or_else(|| GameError::precondition("A target player is required."))?;
        match self.status_of(target) {
            None => return Err(GameError::not_found("Player not found.")),
            Some(PlayerStatus::Alive) => {}
            Some(_) => return Err(GameError::conflict("Player already inactive.")),
        }

        self.apply_elimination(target);
        self.resolution_note = format!("Player {} was removed manually.", self.player_name(target));
        self.repair_turn(target);

        let note = self.resolution_note.clone();
        let mut outcome = ActionOutcome::changed(vec![self.event(EventKind::Elimination, note)]);
        if self.should_end() {
            outcome.merge(self.finish_game("manual removal"));
        }
        Ok(outcome)
    }

    /// Seats a new bot. Sandbox only.
    pub(crate) fn dev_add_player(&mut self, name: Option<&str>) -> Result<ActionOutcome, GameError> {
        if !self.is_dev {
            return Err(GameError::unsupported("This action is only available in the dev_test scenario."));
        }
        let room = self.room_code.as_str().to_lowercase();
        let id = loop {
            self.dev_bot_counter += 1;
            let candidate = PlayerId::new(format!("dev-{room}-{}", self.dev_bot_counter));
            if !self.players.contains_key(&candidate) {
                break candidate;
            }
        };
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("DEV Игрок {}", self.dev_bot_counter), str::to_string);

        self.seat_player(id.clone(), name.clone(), true);
        self.deal_specials(&id);
        if self.phase == Phase::Voting {
            self.vote_candidates.insert(id.clone());
        }
        if self.current_turn.is_none() && self.phase == Phase::Reveal {
            self.current_turn = self.first_alive();
        }
        info!(room = %self.room_code, player = %id, "bot added");
        let event = self.event(EventKind::Info, format!("DEV: added player {name}."));
        Ok(ActionOutcome::changed(vec![event]))
    }

    /// Removes a player from the roster entirely: the given one, or else the
    /// most recently seated bot. Sandbox only.
    pub(crate) fn dev_remove_player(&mut self, target: Option<&PlayerId>) -> Result<ActionOutcome, GameError> {
        if !self.is_dev {
            return Err(GameError::unsupported("This action is only available in the dev_test scenario."));
        }
        let target = match target.filter(|t| !t.is_blank()) {
            Some(target) => target.clone(),
            None => self
                .order
                .iter()
                .rev()
                .find(|id| self.players.get(*id).is_some_and(|p| p.is_bot))
                .cloned()
                .ok_or_else(|| GameError::precondition("No player to remove."))?,
        };
        if !self.players.contains_key(&target) {
            return Err(GameError::not_found("Player not found."));
        }

        let had_turn = self.current_turn.as_ref() == Some(&target);
        let next_turn = had_turn
            .then(|| self.next_unrevealed_alive_after(Some(&target)))
            .flatten()
            .filter(|next| next != &target);

        let name = self.player_name(&target);
        self.players.remove(&target);
        self.order.retain(|id| id != &target);
        self.revealed_this_round.remove(&target);
        self.remove_from_voting(&target);

        if had_turn {
            self.current_turn = next_turn;
            if self.phase == Phase::Reveal {
                if self.current_turn.is_some() {
                    self.schedule_reveal_timeout();
                } else {
                    self.enter_reveal_discussion();
                }
            }
        }
        info!(room = %self.room_code, player = %target, "player removed");

        let mut outcome = ActionOutcome::changed(vec![self.event(EventKind::Info, format!("Removed player {name}."))]);
        if self.should_end() {
            outcome.merge(self.finish_game("DEV: player removed"));
        }
        Ok(outcome)
    }

    /// Marks a player as having left the bunker.
    ///
    /// An alive departure counts as an exile and consumes a vote. Leaving
    /// mid-vote skips the vote straight to resolution. An eliminated player
    /// may leave too; only their status changes.
    pub(crate) fn mark_left_bunker(&mut self, target: Option<&PlayerId>) -> Result<ActionOutcome, GameError> {
        let target = target
            .filter(|t| !t.is_blank())
            .ok_or_else(|| GameError::precondition("A target player is required."))?
            .clone();
        let was_alive = match self.status_of(&target) {
            None => return Err(GameError::not_found("Player not found.")),
            Some(PlayerStatus::LeftBunker) => {
                return Err(GameError::conflict("Player has already left the bunker."));
            }
            Some(status) => status.is_alive(),
        };

        self.player_mut(&target)?.status = PlayerStatus::LeftBunker;
        self.remove_from_voting(&target);
        if was_alive {
            self.total_exiles += 1;
            self.votes_remaining = self.votes_remaining.saturating_sub(1);
        }
        self.repair_turn(&target);

        let name = self.player_name(&target);
        info!(room = %self.room_code, player = %target, was_alive, "player left the bunker");
        let mut outcome = ActionOutcome::changed(vec![
            self.event(EventKind::PlayerLeftBunker, format!("Player {name} left the bunker.")),
        ]);

        if self.phase == Phase::Voting && was_alive {
            self.clear_timer();
            self.phase = Phase::Resolution;
            self.vote_phase = Some(VotePhase::Resolve);
            self.resolution_note = format!("Voting skipped: {name} left the game.");
            let note = self.resolution_note.clone();
            outcome.merge(ActionOutcome::changed(vec![self.stage_event(EventKind::Info, note)]));
            if self.should_end() {
                outcome.merge(self.finish_game("after a player left"));
            } else {
                self.arm_resolution_auto();
            }
            return Ok(outcome);
        }

        if self.should_end() {
            outcome.merge(self.finish_game("after a player left"));
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Post-game
    // -----------------------------------------------------------------------

    pub(crate) fn reveal_world_threat(&mut self, actor: &PlayerId, index: i64) -> Result<ActionOutcome, GameError> {
        if self.phase != Phase::Ended {
            return Err(GameError::phase("Threats are revealed at the end of the game."));
        }
        let modifier = self.world.threat_modifier(&self.threat_table);
        // Any eligible index may go first; reveal order is left to the table.
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < modifier.final_count)
            .ok_or_else(|| GameError::precondition("Invalid threat card."))?;
        if self.settings.final_threat_reveal == FinalThreatReveal::Host && actor != &self.host_id {
            return Err(GameError::permission("Only the host can reveal threats."));
        }
        if !self.world.reveal_threat(index, actor) {
            return Ok(ActionOutcome::unchanged());
        }
        info!(room = %self.room_code, player = %actor, index, "threat revealed");
        Ok(ActionOutcome::changed(Vec::new()))
    }

    pub(crate) fn set_bunker_outcome(&mut self, actor: &PlayerId, outcome: BunkerOutcome) -> Result<ActionOutcome, GameError> {
        let now = self.now();
        let is_host = actor == &self.host_id;
        let post_game = self
            .post_game
            .as_mut()
            .filter(|p| p.is_active)
            .ok_or_else(|| GameError::phase("The game is not over yet."))?;
        if !is_host {
            return Err(GameError::permission("Only the host can decide the bunker's fate."));
        }
        if post_game.outcome.is_some() {
            return Err(GameError::conflict("Outcome already decided."));
        }
        post_game.outcome = Some(outcome);
        post_game.decided_by = Some(actor.clone());
        post_game.decided_at = Some(now);

        let text = match outcome {
            BunkerOutcome::Survived => "Final: the bunker survived.",
            BunkerOutcome::Failed => "Final: the bunker did not survive.",
        };
        info!(room = %self.room_code, ?outcome, "bunker outcome decided");
        Ok(ActionOutcome::changed(vec![self.stage_event(EventKind::Info, text)]))
    }
}
