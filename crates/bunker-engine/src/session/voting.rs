//! Vote collection, the ability window, counting and elimination.

use std::collections::BTreeMap;

use bunker_catalog::{SecretCondition, SpecialEffect, Trigger};
use bunker_protocol::{ActionOutcome, EventKind, PlayerId};
use rand::Rng;
use tracing::info;

use super::GameSession;
use crate::model::{BallotStatus, EffectiveVote, Phase, PlayerStatus, TimerKind, VotePhase, VoteRecord};
use crate::GameError;

const WASTED_VOTE_REASON: &str = "Vote wasted.";

impl GameSession {
    pub(crate) fn vote(&mut self, actor: &PlayerId, target: &PlayerId) -> Result<ActionOutcome, GameError> {
        if self.phase != Phase::Voting || self.vote_phase != Some(VotePhase::Voting) {
            return Err(GameError::phase("No vote is open right now."));
        }
        if actor == target {
            return Err(GameError::precondition("You cannot vote for yourself."));
        }
        if !self.vote_candidates.contains(target) {
            return Err(GameError::not_found("Invalid candidate."));
        }
        if self.revote_disallow.contains(target) {
            return Err(GameError::precondition("You cannot vote for this candidate."));
        }
        if let Some(reason) = self.vote_disabled.get(actor) {
            let reason = if reason.is_empty() { "Your vote is blocked." } else { reason.as_str() };
            return Err(GameError::precondition(reason));
        }
        let (Some(voter), Some(candidate)) = (self.players.get(actor), self.players.get(target)) else {
            return Err(GameError::not_found("Player not found."));
        };
        if !voter.is_alive() {
            return Err(GameError::permission("You are out of the game."));
        }
        if !candidate.is_alive() {
            return Err(GameError::precondition("Candidate is out of the game."));
        }
        if candidate.banned_against.contains(actor) {
            return Err(GameError::precondition("You cannot vote against this player."));
        }
        if self.votes.contains_key(actor) {
            return Err(GameError::conflict("You have already voted."));
        }

        let record = VoteRecord {
            target: Some(target.clone()),
            submitted_at: self.now(),
            is_valid: true,
            reason: None,
        };
        self.votes.insert(actor.clone(), record);
        if self.votes.len() >= self.alive_count() {
            return Ok(self.enter_vote_special_window());
        }
        Ok(ActionOutcome::changed(Vec::new()))
    }

    /// Every alive player has a ballot: snapshot them and open the window in
    /// which vote-only abilities may still be used.
    pub(crate) fn enter_vote_special_window(&mut self) -> ActionOutcome {
        self.base_votes = self.votes.clone();
        self.vote_phase = Some(VotePhase::SpecialWindow);
        self.clear_timer();
        if self.settings.enable_post_vote_discussion_timer {
            self.arm_timer(TimerKind::PostVote, self.settings.post_vote_discussion_seconds);
        }
        let event = self.stage_event(EventKind::Info, "Votes collected. Ability window.");
        ActionOutcome::changed(vec![event])
    }

    pub(crate) fn finalize_voting(&mut self, actor: &PlayerId) -> Result<ActionOutcome, GameError> {
        if self.phase != Phase::Voting {
            return Err(GameError::phase("No vote is open right now."));
        }
        if !matches!(self.vote_phase, Some(VotePhase::SpecialWindow | VotePhase::Voting)) {
            return Err(GameError::phase("Voting already finalized."));
        }
        if *actor != self.host_id {
            return Err(GameError::permission("Only the host can finalize voting."));
        }
        self.clear_timer();

        let mut source = self.current_vote_source().clone();
        if source.is_empty() && !self.base_votes.is_empty() {
            source = self.base_votes.clone();
        }
        let (_, top) = self.vote_totals(&source);
        self.vote_results = source;

        if top.len() > 1 && !self.tie_break_used {
            self.start_tie_break_revote(top);
            let event = self.event(EventKind::Info, self.last_stage_text.clone());
            return Ok(ActionOutcome::changed(vec![event]));
        }

        let mut events = Vec::new();
        let eliminated = (!top.is_empty()).then(|| top[self.rng.random_range(0..top.len())].clone());
        match eliminated {
            Some(id) => {
                self.apply_elimination(&id);
                let name = self.player_name(&id);
                self.resolution_note = format!("Voting result: {name} eliminated.");
                events.push(self.event(EventKind::Elimination, self.resolution_note.clone()));
            }
            None => {
                self.resolution_note = "Tie: no one eliminated.".to_string();
                events.push(self.event(EventKind::Info, self.resolution_note.clone()));
            }
        }

        self.phase = Phase::Resolution;
        self.vote_phase = Some(VotePhase::Resolve);
        self.last_stage_text = self.resolution_note.clone();
        self.votes.clear();

        if self.should_end() {
            events.extend(self.finish_game("after_voting").events);
        } else {
            self.arm_resolution_auto();
        }
        Ok(ActionOutcome::changed(events))
    }

    fn start_tie_break_revote(&mut self, tied: Vec<PlayerId>) {
        self.tie_break_used = true;
        self.vote_candidates = tied.into_iter().collect();
        self.revote_disallow.clear();
        self.reset_votes_for_revote();
        self.vote_phase = Some(VotePhase::Voting);
        self.clear_timer();
        self.last_stage_text = "Tie. Revote between top candidates.".to_string();
        info!(room = %self.room_code, candidates = self.vote_candidates.len(), "tie-break revote");
    }

    /// The ballots that count right now.
    ///
    /// After resolution that is the counted set; inside the ability window
    /// it is the snapshot taken when the window opened.
    pub(crate) fn current_vote_source(&self) -> &BTreeMap<PlayerId, VoteRecord> {
        match self.vote_phase {
            Some(VotePhase::Resolve) if !self.vote_results.is_empty() => &self.vote_results,
            Some(VotePhase::Resolve) if !self.base_votes.is_empty() => &self.base_votes,
            Some(VotePhase::Resolve) => &self.vote_results,
            Some(VotePhase::SpecialWindow) if !self.base_votes.is_empty() => &self.base_votes,
            _ => &self.votes,
        }
    }

    /// Voids `voter`'s ballot for the current vote and any revote of it.
    pub(crate) fn mark_vote_wasted(&mut self, voter: &PlayerId, reason: &str) {
        let reason = if reason.is_empty() { "Vote blocked." } else { reason };
        self.auto_wasted.insert(voter.clone());
        self.vote_disabled.insert(voter.clone(), reason.to_string());
        let record = VoteRecord {
            target: None,
            submitted_at: self.now(),
            is_valid: false,
            reason: Some(reason.to_string()),
        };
        self.votes.insert(voter.clone(), record);
    }

    pub(crate) fn reset_votes_for_revote(&mut self) {
        self.votes.clear();
        self.base_votes.clear();
        let wasted: Vec<PlayerId> = self.auto_wasted.iter().cloned().collect();
        for voter in wasted {
            self.mark_vote_wasted(&voter, WASTED_VOTE_REASON);
        }
    }

    pub(crate) fn reset_vote_state(&mut self) {
        self.votes.clear();
        self.base_votes.clear();
        self.vote_results.clear();
        self.vote_candidates.clear();
        self.vote_disabled.clear();
        self.vote_weights.clear();
        self.auto_wasted.clear();
        self.revote_disallow.clear();
        self.double_against = None;
        self.tie_break_used = false;
    }

    pub(crate) fn start_voting(&mut self) {
        self.clear_timer();
        self.phase = Phase::Voting;
        self.vote_phase = Some(VotePhase::Voting);
        self.reset_vote_state();
        self.vote_candidates = self.alive_ids().into_iter().collect();

        let forced: Vec<PlayerId> = self
            .alive_ids()
            .into_iter()
            .filter(|id| self.players.get(id).is_some_and(|p| p.forced_wasted_vote_next))
            .collect();
        for id in forced {
            self.mark_vote_wasted(&id, WASTED_VOTE_REASON);
            if let Some(player) = self.players.get_mut(&id) {
                player.forced_wasted_vote_next = false;
            }
        }

        self.resolution_note.clear();
        self.round_rules.no_talk_until_voting = false;
        self.last_stage_text = format!("Round {}. Voting.", self.round);
        info!(room = %self.room_code, round = self.round, candidates = self.vote_candidates.len(), "voting started");
    }

    // -----------------------------------------------------------------------
    // Counting
    // -----------------------------------------------------------------------

    /// Every seated player's ballot after all modifiers, in seating order.
    pub(crate) fn effective_votes(&self, source: &BTreeMap<PlayerId, VoteRecord>) -> Vec<(PlayerId, EffectiveVote)> {
        self.order
            .iter()
            .filter(|id| self.players.contains_key(*id))
            .map(|voter| (voter.clone(), self.effective_vote(voter, source.get(voter))))
            .collect()
    }

    fn effective_vote(&self, voter: &PlayerId, record: Option<&VoteRecord>) -> EffectiveVote {
        let Some(record) = record else {
            return EffectiveVote::not_voted();
        };
        let mut vote = EffectiveVote {
            status: BallotStatus::Voted,
            target: record.target.clone(),
            reason: record.reason.clone(),
            weight: 1,
            submitted_at: Some(record.submitted_at),
        };
        if !record.is_valid {
            vote.status = BallotStatus::Invalid;
        }
        if vote.target.is_none() {
            vote.status = BallotStatus::NotVoted;
        }
        if let Some(reason) = self.vote_disabled.get(voter) {
            invalidate(&mut vote, reason.as_str());
        }
        if let Some(target) = record.target.as_ref() {
            if self.revote_disallow.contains(target) {
                invalidate(&mut vote, "Cannot vote for this candidate.");
            }
            if !self.vote_candidates.contains(target) {
                invalidate(&mut vote, "Candidate unavailable.");
            }
            if self
                .players
                .get(target)
                .is_some_and(|t| t.banned_against.contains(voter))
            {
                invalidate(&mut vote, "Voting against this player is banned.");
            }
        }

        match (vote.status, vote.target.as_ref()) {
            (BallotStatus::Voted, Some(target)) => {
                if let Some(weight) = self.vote_weights.get(voter).filter(|w| **w > 0) {
                    vote.weight = *weight;
                }
                if self.double_against.as_ref() == Some(target) {
                    vote.weight *= 2;
                }
            }
            _ => {
                vote.target = None;
                vote.weight = 0;
            }
        }
        vote
    }

    /// Per-candidate totals and the sorted set of candidates sharing the
    /// maximum. With no weight anywhere every candidate ties.
    pub(crate) fn vote_totals(&self, source: &BTreeMap<PlayerId, VoteRecord>) -> (BTreeMap<PlayerId, i64>, Vec<PlayerId>) {
        let mut totals: BTreeMap<PlayerId, i64> = self
            .vote_candidates
            .iter()
            .map(|id| (id.clone(), 0))
            .collect();
        for (voter, vote) in self.effective_votes(source) {
            let (BallotStatus::Voted, Some(target)) = (vote.status, vote.target) else {
                continue;
            };
            if !self.is_alive(&voter) {
                continue;
            }
            *totals.entry(target).or_insert(0) += vote.weight;
        }

        let mut max = 0;
        let mut top = Vec::new();
        for (id, count) in &totals {
            if *count > max {
                max = *count;
                top = vec![id.clone()];
            } else if *count == max {
                top.push(id.clone());
            }
        }
        if top.is_empty() {
            top = self.vote_candidates.iter().cloned().collect();
        }
        top.sort();
        (totals, top)
    }

    // -----------------------------------------------------------------------
    // Elimination
    // -----------------------------------------------------------------------

    /// Drops a player from every piece of vote bookkeeping.
    pub(crate) fn remove_from_voting(&mut self, id: &PlayerId) {
        self.vote_candidates.remove(id);
        self.votes.remove(id);
        self.base_votes.remove(id);
        self.vote_results.remove(id);
        self.vote_weights.remove(id);
        self.vote_disabled.remove(id);
        self.auto_wasted.remove(id);
        self.revote_disallow.remove(id);
        if self.double_against.as_ref() == Some(id) {
            self.double_against = None;
        }
    }

    /// Eliminates an alive player and fires every ability that reacts to it.
    pub(crate) fn apply_elimination(&mut self, id: &PlayerId) {
        let Some(target) = self.players.get_mut(id).filter(|p| p.is_alive()) else {
            return;
        };
        target.status = PlayerStatus::Eliminated;
        self.total_exiles += 1;
        self.last_eliminated = Some(id.clone());
        self.votes_remaining = self.votes_remaining.saturating_sub(1);
        info!(room = %self.room_code, player = %id, exiles = self.total_exiles, "player eliminated");

        self.fire_owner_eliminated(id);
        self.fire_secret_triggers(id);
        self.remove_from_voting(id);
    }

    fn fire_owner_eliminated(&mut self, id: &PlayerId) {
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        for special in player.specials.iter_mut().filter(|s| {
            !s.used && s.definition.implemented && s.definition.trigger == Trigger::OnOwnerEliminated
        }) {
            special.used = true;
            if let SpecialEffect::AddFinalThreat(params) = &special.definition.effect {
                let key = params
                    .threat_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .unwrap_or(special.definition.id.as_str());
                self.final_threats.push(key.to_string());
            }
        }
    }

    /// Fires secret abilities whose condition matches the player just
    /// eliminated. A fired ability wastes its owner's next ballot.
    fn fire_secret_triggers(&mut self, eliminated: &PlayerId) {
        let extremes = self.age_extremes(Some(eliminated));
        let mut fired: Vec<(PlayerId, String)> = Vec::new();
        for owner in self.order.iter().filter(|id| self.is_alive(id)) {
            let Some(player) = self.players.get(owner) else {
                continue;
            };
            for special in player.specials.iter().filter(|s| {
                !s.used && s.definition.implemented && s.definition.trigger == Trigger::SecretOnEliminate
            }) {
                let SpecialEffect::ForcedWastedVoteOnNextVoting(params) = &special.definition.effect else {
                    continue;
                };
                let triggered = match params.condition {
                    Some(SecretCondition::LeftNeighborEliminated) => {
                        self.neighbor_ids(owner, Some(eliminated)).0.as_ref() == Some(eliminated)
                    }
                    Some(SecretCondition::RightNeighborEliminated) => {
                        self.neighbor_ids(owner, Some(eliminated)).1.as_ref() == Some(eliminated)
                    }
                    Some(SecretCondition::YoungestByRevealedAgeEliminated) => {
                        extremes.as_ref().is_some_and(|(young, _)| young == eliminated)
                    }
                    Some(SecretCondition::OldestByRevealedAgeEliminated) => {
                        extremes.as_ref().is_some_and(|(_, old)| old == eliminated)
                    }
                    Some(SecretCondition::FirstRevealedHealthEliminated) => {
                        self.first_health_revealer.as_ref() == Some(eliminated)
                    }
                    None => false,
                };
                if triggered {
                    fired.push((owner.clone(), special.instance_id.clone()));
                }
            }
        }

        for (owner, instance_id) in fired {
            let Some(player) = self.players.get_mut(&owner) else {
                continue;
            };
            if let Some(special) = player.specials.iter_mut().find(|s| s.instance_id == instance_id) {
                special.used = true;
            }
            player.forced_wasted_vote_next = true;
            info!(room = %self.room_code, player = %owner, trigger = %eliminated, "secret ability fired");
        }
    }
}

fn invalidate(vote: &mut EffectiveVote, reason: &str) {
    vote.status = BallotStatus::Invalid;
    if vote.reason.is_none() {
        vote.reason = Some(reason.to_string());
    }
}
