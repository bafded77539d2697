//! Shared fixtures: an in-memory card catalog, seeded games and a few
//! drivers that push a game to a given phase.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use bunker_catalog::{
    AbilityCatalog, AssetCatalog, ChoiceKind, SpecialDefinition, SpecialEffect, TargetScope, Trigger,
};
use bunker_engine::{
    ContinuePermission, GameEngine, GameRuleset, GameSession, GameSettings, HandCard, ManualClock, Phase,
    RulesetMode, Scenario, SeatedPlayer, SessionSetup, start_session,
};
use bunker_protocol::{ActionOutcome, GameAction, PlayerId, RoomCode};

pub const START_MS: i64 = 1_700_000_000_000;

pub fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

/// Every hand deck with 40 cards, biology cards carrying distinct ages,
/// plus the world decks.
pub fn catalog() -> AssetCatalog {
    catalog_with_health(40)
}

/// Like [`catalog`] but with only `health` cards in the health deck.
pub fn catalog_with_health(health: usize) -> AssetCatalog {
    let mut files: Vec<(String, String)> = Vec::new();
    for deck in ["Профессия", "Хобби", "Багаж", "Факты"] {
        for n in 1..=40 {
            files.push((deck.to_string(), format!("{deck} {n}.png")));
        }
    }
    for n in 1..=health {
        files.push(("Здоровье".to_string(), format!("Здоровье {n}.png")));
    }
    for n in 1..=40 {
        files.push(("Биология".to_string(), format!("Возраст {}.png", 18 + n)));
    }
    for n in 1..=3 {
        files.push(("Катастрофы".to_string(), format!("Катастрофа {n}.png")));
    }
    for n in 1..=10 {
        files.push(("Бункер".to_string(), format!("Комната {n}.png")));
        files.push(("Угрозы".to_string(), format!("Угроза {n}.png")));
    }
    AssetCatalog::from_files(files)
}

/// A plain, untargeted active ability with no requirements.
pub fn ability(id: &str, effect: SpecialEffect) -> SpecialDefinition {
    SpecialDefinition {
        id: id.to_string(),
        title: format!("Ability {id}"),
        text: String::new(),
        trigger: Trigger::Active,
        effect,
        implemented: true,
        requires: Vec::new(),
        choice_kind: ChoiceKind::None,
        target_scope: None,
        allow_self: false,
        asset_id: None,
    }
}

/// An ability aimed at any other alive player.
pub fn targeted(id: &str, effect: SpecialEffect) -> SpecialDefinition {
    SpecialDefinition {
        choice_kind: ChoiceKind::Player,
        target_scope: Some(TargetScope::AnyAlive),
        ..ability(id, effect)
    }
}

/// A pool in which every draw yields a copy of `definition`.
pub fn pool_of(definition: SpecialDefinition, copies: usize) -> AbilityCatalog {
    AbilityCatalog::new(
        (0..copies)
            .map(|n| SpecialDefinition {
                id: format!("{}-{n}", definition.id),
                ..definition.clone()
            })
            .collect(),
    )
}

/// A ruleset with `votes` eliminations in every round.
pub fn ruleset(players: u32, votes: &[u32], total_exiles: u32, bunker_seats: u32) -> GameRuleset {
    GameRuleset {
        player_count: players,
        votes_per_round: votes.to_vec(),
        total_exiles,
        bunker_seats,
        ruleset_mode: RulesetMode::Manual,
        manual_config: None,
    }
}

/// Builds seeded games with players `p1..pN`, `p1` hosting.
pub struct GameBuilder {
    players: usize,
    scenario: Scenario,
    settings: GameSettings,
    ruleset: Option<GameRuleset>,
    abilities: AbilityCatalog,
    assets: Option<AssetCatalog>,
    seed: u64,
}

impl GameBuilder {
    pub fn new(players: usize) -> Self {
        Self {
            players,
            scenario: Scenario::Classic,
            settings: GameSettings {
                continue_permission: ContinuePermission::Anyone,
                ..GameSettings::default()
            },
            ruleset: None,
            abilities: pool_of(ability("weight", SpecialEffect::None), 32),
            assets: None,
            seed: 7,
        }
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn ruleset(mut self, ruleset: GameRuleset) -> Self {
        self.ruleset = Some(ruleset);
        self
    }

    pub fn abilities(mut self, abilities: AbilityCatalog) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn assets(mut self, assets: AssetCatalog) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn with_setup<T>(self, start: impl FnOnce(SessionSetup<'_>) -> T) -> (T, ManualClock) {
        let assets = self.assets.unwrap_or_else(catalog);
        let clock = ManualClock::new(START_MS);
        let seats = (1..=self.players)
            .map(|n| SeatedPlayer::new(format!("p{n}").as_str(), format!("Player {n}")))
            .collect();
        let mut setup = SessionSetup::new(RoomCode::new("ABCD"), pid("p1"), seats, &assets, &self.abilities)
            .with_scenario(self.scenario)
            .with_settings(self.settings)
            .with_seed(self.seed)
            .with_clock(Arc::new(clock.clone()));
        if let Some(ruleset) = self.ruleset {
            setup = setup.with_ruleset(ruleset);
        }
        (start(setup), clock)
    }

    pub fn build(self) -> (GameSession, ManualClock) {
        self.with_setup(GameSession::new)
    }

    pub fn build_engine(self) -> (Box<dyn GameEngine>, ManualClock) {
        self.with_setup(start_session)
    }
}

/// The first face-down card in `player`'s hand.
pub fn first_hidden(session: &GameSession, player: &str) -> String {
    session
        .player(&pid(player))
        .and_then(|p| p.hand.iter().find(|c| !c.revealed))
        .map(|c| c.instance_id.clone())
        .expect("player has a hidden card")
}

/// Whoever holds the turn reveals their first hidden card.
pub fn reveal_current(session: &mut GameSession) -> ActionOutcome {
    let actor = session.current_turn().cloned().expect("a turn is open");
    let card = first_hidden(session, actor.as_str());
    session
        .apply_action(&actor, GameAction::RevealCard { card_id: card })
        .expect("reveal succeeds")
}

/// Reveals and continues until the game leaves the reveal phases.
///
/// Needs a continue permission that lets `p1` advance.
pub fn play_until_vote(session: &mut GameSession) {
    for _ in 0..200 {
        match session.phase() {
            Phase::Reveal => {
                reveal_current(session);
            }
            Phase::RevealDiscussion => {
                session
                    .apply_action(&pid("p1"), GameAction::ContinueRound)
                    .expect("continue succeeds");
            }
            _ => return,
        }
    }
    panic!("game never left the reveal phases");
}

pub fn vote(session: &mut GameSession, voter: &str, target: &str) -> ActionOutcome {
    session
        .apply_action(
            &pid(voter),
            GameAction::Vote {
                target_player_id: pid(target),
            },
        )
        .expect("vote accepted")
}

/// The current-turn player reveals a hidden card from `deck`, then `p1`
/// continues. Returns the revealer.
pub fn reveal_from(session: &mut GameSession, deck: &str) -> PlayerId {
    let actor = session.current_turn().cloned().expect("a turn is open");
    let card = session
        .player(&actor)
        .and_then(|p| p.hand.iter().find(|c| !c.revealed && c.deck == deck))
        .map(|c| c.instance_id.clone())
        .expect("player holds a hidden card of the deck");
    session
        .apply_action(&actor, GameAction::RevealCard { card_id: card })
        .expect("reveal succeeds");
    session
        .apply_action(&pid("p1"), GameAction::ContinueRound)
        .expect("continue succeeds");
    actor
}

/// The card in `player`'s hand from `deck`.
pub fn card_in(session: &GameSession, player: &str, deck: &str) -> HandCard {
    session
        .player(&pid(player))
        .and_then(|p| p.hand.iter().find(|c| c.deck == deck))
        .cloned()
        .expect("player holds a card of the deck")
}

/// Every hand card and ability instance id in the session is distinct.
pub fn assert_unique_instance_ids(session: &GameSession) {
    let mut seen = BTreeSet::new();
    for player in session.players() {
        let cards = player.hand.iter().map(|c| c.instance_id.clone());
        let specials = player.specials.iter().map(|s| s.instance_id.clone());
        for id in cards.chain(specials) {
            assert!(seen.insert(id.clone()), "duplicate instance id {id}");
        }
    }
}
