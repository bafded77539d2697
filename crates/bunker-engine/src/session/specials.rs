//! Dealing abilities and activating them.

use bunker_catalog::{
    CategoryKey, ChoiceKind, Requirement, SpecialDefinition, SpecialEffect, TargetScope, Trigger,
};
use bunker_protocol::{ActionOutcome, EventKind, GameEvent, NeighborSide, PlayerId, SpecialPayload};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::GameSession;
use crate::model::{HandCard, Phase, SpecialState, VotePhase};
use crate::settings::SpecialUsage;
use crate::GameError;

const MISSING_SPECIAL_ID: &str = "missing-special";

/// Placeholder dealt when the ability pool has run dry.
fn missing_special() -> SpecialDefinition {
    SpecialDefinition {
        id: MISSING_SPECIAL_ID.to_string(),
        title: "Нет доступного условия".to_string(),
        text: "Колода особых условий пуста.".to_string(),
        trigger: Trigger::Active,
        effect: SpecialEffect::None,
        implemented: false,
        requires: Vec::new(),
        choice_kind: ChoiceKind::None,
        target_scope: None,
        allow_self: false,
        asset_id: None,
    }
}

/// A card face: asset id, label and the missing flag.
type CardFace = (String, String, bool);

impl GameSession {
    // -----------------------------------------------------------------------
    // Dealing
    // -----------------------------------------------------------------------

    /// Deals a player's starting ability, plus the sandbox choice copy.
    pub(crate) fn deal_specials(&mut self, owner: &PlayerId) {
        let mut dealt = vec![self.draw_special(owner, self.is_dev)];
        if let Some(mut definition) = self.dev_choice_template.clone() {
            definition.id = format!("dev-choice-{owner}");
            definition.title = format!("{} (DEV)", definition.title.trim());
            definition.implemented = true;
            definition.requires.clear();
            definition.choice_kind = ChoiceKind::Category;
            definition.target_scope = None;
            definition.allow_self = false;
            dealt.push(SpecialState {
                instance_id: self.next_special_instance_id(owner),
                definition,
                revealed_public: true,
                used: false,
            });
        }
        if let Some(player) = self.players.get_mut(owner) {
            player.specials.extend(dealt);
        }
    }

    /// Draws one ability uniformly from the session pool.
    fn draw_special(&mut self, owner: &PlayerId, revealed_public: bool) -> SpecialState {
        let definition = if self.special_pool.is_empty() {
            missing_special()
        } else {
            let index = self.rng.random_range(0..self.special_pool.len());
            let mut definition = self.special_pool.swap_remove(index);
            self.resolve_special_asset(&mut definition);
            definition
        };
        SpecialState {
            instance_id: self.next_special_instance_id(owner),
            definition,
            revealed_public,
            used: false,
        }
    }

    fn resolve_special_asset(&self, definition: &mut SpecialDefinition) {
        let candidates = definition.asset_candidates();
        match self.special_assets.lookup(candidates.iter().map(String::as_str)) {
            Some(found) => definition.asset_id = Some(found.to_string()),
            None if !self.special_assets.is_empty() => {
                warn!(
                    room = %self.room_code,
                    special = %definition.id,
                    asset = definition.asset_id.as_deref().unwrap_or_default(),
                    "no card image found for ability"
                );
            }
            None => {}
        }
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    pub(crate) fn apply_special(
        &mut self,
        actor: &PlayerId,
        instance_id: &str,
        payload: &SpecialPayload,
    ) -> Result<ActionOutcome, GameError> {
        let player = self
            .players
            .get(actor)
            .filter(|p| p.is_alive())
            .ok_or_else(|| GameError::not_found("Player not found."))?;
        if self.phase == Phase::Ended {
            return Err(GameError::conflict("Game already over."));
        }
        let special = player
            .specials
            .iter()
            .find(|s| !instance_id.trim().is_empty() && s.instance_id == instance_id)
            .ok_or_else(|| GameError::not_found("Ability not found."))?;
        if !special.definition.implemented {
            return Err(GameError::unsupported("This ability is not implemented yet."));
        }
        if special.used {
            return Err(GameError::conflict("This ability has already been used."));
        }
        if !self.is_dev
            && self.settings.special_usage == SpecialUsage::OnlyDuringVoting
            && self.phase != Phase::Voting
        {
            return Err(GameError::phase("Abilities can only be used during voting."));
        }
        if special.definition.trigger.is_automatic() {
            return Err(GameError::precondition("This ability fires automatically."));
        }
        let definition = special.definition.clone();

        let has_param_category = definition.effect.category().is_some();
        if definition.choice_kind != ChoiceKind::None
            && payload.is_empty()
            && !(definition.choice_kind == ChoiceKind::Category && has_param_category)
        {
            return Err(GameError::precondition("A choice is needed to use this ability."));
        }
        let target = self.resolve_special_target(actor, &definition, payload)?;
        if definition.choice_kind == ChoiceKind::Player && !definition.allow_self && target.as_ref() == Some(actor) {
            return Err(GameError::precondition("You cannot choose yourself."));
        }
        self.check_requirements(&definition, target.as_ref())?;

        let mut events = self.apply_effect(actor, &definition, target.as_ref(), payload)?;

        let name = self.player_name(actor);
        let player = self.player_mut(actor)?;
        let mut announce = false;
        if let Some(special) = player.specials.iter_mut().find(|s| s.instance_id == instance_id) {
            special.used = true;
            announce = !special.revealed_public;
            special.revealed_public = true;
        }
        if announce {
            events.push(self.event(
                EventKind::Info,
                format!("{name} applies ability: {}.", definition.title),
            ));
        }
        info!(room = %self.room_code, player = %actor, special = %definition.id, effect = definition.effect.kind(), "ability applied");
        Ok(ActionOutcome::changed(events))
    }

    /// Resolves the target according to the ability's scope.
    fn resolve_special_target(
        &self,
        actor: &PlayerId,
        definition: &SpecialDefinition,
        payload: &SpecialPayload,
    ) -> Result<Option<PlayerId>, GameError> {
        match definition.target_scope {
            Some(TargetScope::Neighbors) => {
                let (left, right) = self.neighbor_ids(actor, None);
                if let Some(target) = payload.target() {
                    return if Some(target) == left.as_ref() || Some(target) == right.as_ref() {
                        Ok(Some(target.clone()))
                    } else {
                        Err(GameError::precondition("Invalid neighbor."))
                    };
                }
                match payload.side {
                    Some(NeighborSide::Left) if left.is_some() => Ok(left),
                    Some(NeighborSide::Right) if right.is_some() => Ok(right),
                    _ => Err(GameError::not_found("Neighbor not found.")),
                }
            }
            Some(TargetScope::SelfOnly) => Ok(Some(actor.clone())),
            Some(TargetScope::AnyAlive | TargetScope::AnyIncludingSelf) => {
                let target = payload
                    .target()
                    .ok_or_else(|| GameError::precondition("Choose a target."))?;
                if !self.is_alive(target) {
                    return Err(GameError::precondition("Invalid target."));
                }
                Ok(Some(target.clone()))
            }
            None => Ok(payload.target().cloned()),
        }
    }

    fn check_requirements(&self, definition: &SpecialDefinition, target: Option<&PlayerId>) -> Result<(), GameError> {
        let target_player = target.and_then(|t| self.players.get(t));
        let target_has = |category: CategoryKey, revealed_only: bool| {
            target_player.is_some_and(|p| {
                p.hand
                    .iter()
                    .any(|c| c.is_in(category) && (c.revealed || !revealed_only))
            })
        };
        let revealed_only = !self.is_dev;

        for requirement in &definition.requires {
            match requirement {
                Requirement::PhaseVoting if !self.is_dev && self.phase != Phase::Voting => {
                    return Err(GameError::phase("This ability can only be used during voting."));
                }
                Requirement::PhaseReveal if !self.is_dev && self.phase != Phase::Reveal => {
                    return Err(GameError::phase("This ability can only be used during the reveal phase."));
                }
                Requirement::VotingStarted
                    if !self.is_dev && self.votes.is_empty() && self.base_votes.is_empty() =>
                {
                    return Err(GameError::precondition("Voting has not started yet."));
                }
                Requirement::TargetHasBaggage if !target_has(CategoryKey::Baggage, false) => {
                    return Err(GameError::precondition("The chosen player has no baggage."));
                }
                Requirement::TargetHasRevealedHealth if !target_has(CategoryKey::Health, revealed_only) => {
                    return Err(GameError::precondition("The chosen player has no revealed health card."));
                }
                Requirement::TargetHasRevealedProfession
                    if !target_has(CategoryKey::Profession, revealed_only) =>
                {
                    return Err(GameError::precondition("The chosen player has no revealed profession."));
                }
                Requirement::TargetHasRevealedSameCategory
                    if !definition
                        .effect
                        .category()
                        .is_some_and(|c| target_has(c, revealed_only)) =>
                {
                    return Err(GameError::precondition("The neighbor has no revealed card of this category."));
                }
                Requirement::NeedsNeighborIndexing if self.order.len() <= 1 => {
                    return Err(GameError::precondition("Not enough players for neighbors."));
                }
                Requirement::AgeFieldAvailable | Requirement::SomeRevealedAges
                    if self.age_extremes(None).is_none() =>
                {
                    return Err(GameError::precondition("No player has revealed an age yet."));
                }
                Requirement::TrackFirstRevealHealth if self.first_health_revealer.is_none() => {
                    return Err(GameError::precondition("No health card has been revealed yet."));
                }
                _ => {}
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    /// Runs the effect. All checks come before the first mutation.
    fn apply_effect(
        &mut self,
        actor: &PlayerId,
        definition: &SpecialDefinition,
        target: Option<&PlayerId>,
        payload: &SpecialPayload,
    ) -> Result<Vec<GameEvent>, GameError> {
        let effect = &definition.effect;
        if !self.is_dev && effect.is_voting_window_only() && self.vote_phase != Some(VotePhase::SpecialWindow) {
            return Err(GameError::phase("This ability can only be used in the voting ability window."));
        }
        let actor_name = self.player_name(actor);

        let message = match effect {
            SpecialEffect::BanVoteAgainst => {
                self.require_voting()?;
                let target = self.alive_target(actor, definition, target)?;
                self.player_mut(actor)?.banned_against.insert(target);
                format!("{actor_name} uses \"{}\".", definition.title)
            }
            SpecialEffect::VoteWeight(params) => {
                self.require_voting()?;
                let weight = if params.weight <= 0 { 2 } else { params.weight };
                self.vote_weights.insert(actor.clone(), weight);
                format!("{actor_name} strengthens their vote.")
            }
            SpecialEffect::DisableVote => {
                self.require_voting()?;
                let target = self.alive_target(actor, definition, target)?;
                self.mark_vote_wasted(&target, "Vote blocked.");
                format!("{actor_name} blocks the vote of {}.", self.player_name(&target))
            }
            SpecialEffect::DoubleVotesAgainstAndDisableSelfVote => {
                self.require_voting()?;
                let target = self.alive_target(actor, definition, target)?;
                self.double_against = Some(target.clone());
                self.mark_vote_wasted(actor, "Your vote is wasted.");
                format!("{actor_name} doubles the votes against {}.", self.player_name(&target))
            }
            SpecialEffect::ForceRevote(params) => {
                self.require_voting()?;
                let source = self.current_vote_source().clone();
                if source.is_empty() {
                    return Err(GameError::precondition("No voting data."));
                }
                if params.disallow_previous_candidate {
                    let (_, top) = self.vote_totals(&source);
                    self.revote_disallow = top.into_iter().collect();
                }
                self.reset_votes_for_revote();
                self.vote_phase = Some(VotePhase::Voting);
                self.clear_timer();
                format!("{actor_name} forces a revote.")
            }
            SpecialEffect::SwapRevealedWithNeighbor(params) => {
                let target = target
                    .filter(|t| self.is_alive(t))
                    .cloned()
                    .ok_or_else(|| GameError::not_found("Neighbor not found."))?;
                let category = params
                    .category
                    .ok_or_else(|| GameError::precondition("Unknown category."))?;
                let (Some(mine), Some(theirs)) = (
                    self.card_for_special(actor, category),
                    self.card_for_special(&target, category),
                ) else {
                    return Err(GameError::precondition("Both players need revealed cards."));
                };
                let my_face = self.card_face(actor, &mine);
                let their_face = self.card_face(&target, &theirs);
                if let (Some(my_face), Some(their_face)) = (my_face, their_face) {
                    self.set_card_face(actor, &mine, their_face);
                    self.set_card_face(&target, &theirs, my_face);
                }
                format!("{actor_name} swaps a revealed card with {}.", self.player_name(&target))
            }
            SpecialEffect::ReplaceRevealedCard(params) | SpecialEffect::DiscardRevealedAndDealHidden(params) => {
                let discard = matches!(effect, SpecialEffect::DiscardRevealedAndDealHidden(_));
                let target = target
                    .filter(|t| self.is_alive(t))
                    .cloned()
                    .ok_or_else(|| GameError::precondition("Target is out of the game."))?;
                let category = params
                    .category
                    .ok_or_else(|| GameError::precondition("Unknown category."))?;
                let instance = self
                    .card_for_special(&target, category)
                    .ok_or_else(|| GameError::precondition("Target has no revealed card of this category."))?;
                let deck = category.deck_name();
                let card = self
                    .pools
                    .draw(deck, &mut self.rng)
                    .ok_or_else(|| GameError::precondition(format!("Deck {deck} is empty.")))?;
                self.set_card_face(&target, &instance, (card.id, card.label, false));
                if discard {
                    if let Some(hand_card) = self.hand_card_mut(&target, &instance) {
                        hand_card.revealed = false;
                    }
                    format!("{actor_name} discards a revealed card of {}.", self.player_name(&target))
                } else {
                    format!("{actor_name} replaces a revealed card of {}.", self.player_name(&target))
                }
            }
            SpecialEffect::RedealAllRevealed(params) => {
                let category = params
                    .category
                    .ok_or_else(|| GameError::precondition("Unknown category."))?;
                let slots = self.redeal_slots(category);
                if slots.is_empty() {
                    return Err(GameError::precondition("No revealed cards to redeal."));
                }
                let mut faces: Vec<CardFace> = slots
                    .iter()
                    .filter_map(|(owner, instance)| self.card_face(owner, instance))
                    .collect();
                faces.shuffle(&mut self.rng);
                for ((owner, instance), face) in slots.iter().zip(faces) {
                    self.set_card_face(owner, instance, face);
                }
                format!("{actor_name} redeals the revealed {} cards.", category.label())
            }
            SpecialEffect::ForceRevealCategoryForAll(params) => {
                let category = payload
                    .category()
                    .and_then(CategoryKey::resolve)
                    .or(params.category)
                    .ok_or_else(|| GameError::precondition("Choose a category."))?;
                self.round_rules.forced_category = Some(category);
                format!("{actor_name} requires everyone to reveal {}.", category.label())
            }
            SpecialEffect::SetRoundRule(params) => {
                self.round_rules.no_talk_until_voting = params.no_talk_until_voting.unwrap_or(true);
                format!("{actor_name} sets a round rule.")
            }
            SpecialEffect::StealBaggageAndGiveSpecial(params) => {
                let target = self.alive_target(actor, definition, target)?;
                let stolen = self
                    .players
                    .get(&target)
                    .and_then(|p| p.hand.iter().find(|c| c.is_in(CategoryKey::Baggage)))
                    .cloned()
                    .ok_or_else(|| GameError::precondition("Target has no baggage."))?;
                let give = usize::try_from(params.give_special_count.max(1)).unwrap_or(1);
                if self.special_pool.len() < give {
                    return Err(GameError::precondition("The ability deck is empty."));
                }

                if let Some(victim) = self.players.get_mut(&target) {
                    victim.hand.retain(|c| c.instance_id != stolen.instance_id);
                }
                let moved = HandCard {
                    instance_id: self.next_card_instance_id(actor),
                    ..stolen
                };
                self.player_mut(actor)?.hand.push(moved);
                for _ in 0..give {
                    let special = self.draw_special(&target, false);
                    if let Some(victim) = self.players.get_mut(&target) {
                        victim.specials.push(special);
                    }
                }
                format!("{actor_name} takes the baggage of {}.", self.player_name(&target))
            }
            SpecialEffect::AddFinalThreat(params) => {
                let key = params
                    .threat_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .unwrap_or(definition.id.as_str());
                self.final_threats.push(key.to_string());
                format!("{actor_name} adds a threat to the finale.")
            }
            SpecialEffect::ForcedWastedVoteOnNextVoting(_) | SpecialEffect::None | SpecialEffect::Unsupported(_) => {
                debug!(room = %self.room_code, effect = effect.kind(), "unsupported effect");
                return Err(GameError::unsupported("Effect not supported."));
            }
        };
        Ok(vec![self.event(EventKind::Info, message)])
    }

    fn require_voting(&self) -> Result<(), GameError> {
        if self.phase != Phase::Voting {
            return Err(GameError::phase("No vote is open right now."));
        }
        Ok(())
    }

    /// An alive target, refusing the actor unless the ability allows it.
    fn alive_target(
        &self,
        actor: &PlayerId,
        definition: &SpecialDefinition,
        target: Option<&PlayerId>,
    ) -> Result<PlayerId, GameError> {
        let target = target
            .filter(|t| self.is_alive(t))
            .ok_or_else(|| GameError::precondition("Target is out of the game."))?;
        if target == actor && !definition.allow_self {
            return Err(GameError::precondition("You cannot choose yourself."));
        }
        Ok(target.clone())
    }

    /// The first revealed card of `category`; in the sandbox any card will do.
    fn card_for_special(&self, owner: &PlayerId, category: CategoryKey) -> Option<String> {
        let hand = &self.players.get(owner)?.hand;
        hand.iter()
            .find(|c| c.revealed && c.is_in(category))
            .or_else(|| {
                self.is_dev
                    .then(|| hand.iter().find(|c| c.is_in(category)))
                    .flatten()
            })
            .map(|c| c.instance_id.clone())
    }

    /// Alive players' revealed cards of `category` in seating order.
    fn redeal_slots(&self, category: CategoryKey) -> Vec<(PlayerId, String)> {
        let mut slots = Vec::new();
        for id in self.alive_ids() {
            let Some(player) = self.players.get(&id) else {
                continue;
            };
            let in_category = player.hand.iter().filter(|c| c.is_in(category));
            let mut cards: Vec<String> = in_category
                .clone()
                .filter(|c| c.revealed)
                .map(|c| c.instance_id.clone())
                .collect();
            if self.is_dev && cards.is_empty() {
                cards = in_category.map(|c| c.instance_id.clone()).collect();
            }
            slots.extend(cards.into_iter().map(|instance| (id.clone(), instance)));
        }
        slots
    }

    fn hand_card_mut(&mut self, owner: &PlayerId, instance_id: &str) -> Option<&mut HandCard> {
        self.players
            .get_mut(owner)?
            .hand
            .iter_mut()
            .find(|c| c.instance_id == instance_id)
    }

    fn card_face(&self, owner: &PlayerId, instance_id: &str) -> Option<CardFace> {
        self.players
            .get(owner)?
            .hand
            .iter()
            .find(|c| c.instance_id == instance_id)
            .map(|c| (c.card_id.clone(), c.label.clone(), c.missing))
    }

    fn set_card_face(&mut self, owner: &PlayerId, instance_id: &str, (card_id, label, missing): CardFace) {
        if let Some(card) = self.hand_card_mut(owner, instance_id) {
            card.card_id = card_id;
            card.label = label;
            card.missing = missing;
        }
    }
}
