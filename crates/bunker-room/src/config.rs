//! Room limits, lobby setup and the resources a room starts games with.

use std::fmt;
use std::sync::Arc;

use bunker_catalog::{AbilityCatalog, AssetCatalog};
use bunker_engine::{
    Clock, GameRuleset, GameSettings, MAX_CLASSIC_PLAYERS, MIN_CLASSIC_PLAYERS, ManualRulesConfig,
    Scenario, SystemClock, ThreatModifierTable,
};
use bunker_timer::TimerConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Limits shared by every room a manager creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Minimum seated players for a classic game.
    pub min_players: usize,

    /// Hard cap on the roster. The host's `maxPlayers` setting can only
    /// lower it.
    pub max_players: usize,

    /// Minimum seated players for the sandbox scenario.
    pub dev_min_players: usize,

    /// Whether hosts may pick `dev_test`.
    pub allow_dev_scenarios: bool,

    /// Command channel capacity per room actor.
    pub channel_size: usize,

    pub timer: TimerConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_CLASSIC_PLAYERS as usize,
            max_players: MAX_CLASSIC_PLAYERS as usize,
            dev_min_players: 1,
            allow_dev_scenarios: false,
            channel_size: 64,
            timer: TimerConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Minimum roster for `scenario`.
    pub fn min_players_for(&self, scenario: Scenario) -> usize {
        if scenario.is_dev() {
            self.dev_min_players
        } else {
            self.min_players
        }
    }
}

// ---------------------------------------------------------------------------
// GameResources
// ---------------------------------------------------------------------------

/// Catalogs and seams every game in every room is started with.
///
/// Loaded once and shared; sessions take their own working copies.
#[derive(Clone)]
pub struct GameResources {
    pub assets: Arc<AssetCatalog>,
    pub abilities: Arc<AbilityCatalog>,
    pub clock: Arc<dyn Clock>,
    pub threat_table: ThreatModifierTable,
    /// Zero draws a fresh seed per game.
    pub seed: u64,
}

impl GameResources {
    pub fn new(assets: AssetCatalog, abilities: AbilityCatalog) -> Self {
        Self {
            assets: Arc::new(assets),
            abilities: Arc::new(abilities),
            clock: Arc::new(SystemClock),
            threat_table: ThreatModifierTable::default(),
            seed: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_threat_table(mut self, table: ThreatModifierTable) -> Self {
        self.threat_table = table;
        self
    }
}

impl fmt::Debug for GameResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameResources")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Lobby settings
// ---------------------------------------------------------------------------

/// How the ruleset is chosen when the game starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RulesetChoice {
    /// The preset for the roster size at start.
    #[default]
    Auto,
    Manual(ManualRulesConfig),
}

impl RulesetChoice {
    pub fn resolve(&self, players: usize) -> GameRuleset {
        let players = u32::try_from(players).unwrap_or(u32::MAX);
        match self {
            Self::Auto => GameRuleset::auto(players),
            Self::Manual(config) => GameRuleset::manual(config, players),
        }
    }
}

/// Everything the host sets up in the lobby.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySettings {
    pub scenario: Scenario,
    pub settings: GameSettings,
    pub ruleset: RulesetChoice,
}

impl LobbySettings {
    /// Applies a partial update. Switching scenario without sending
    /// settings resets them to that scenario's defaults.
    pub fn apply(&mut self, update: LobbyUpdate) {
        if let Some(scenario) = update.scenario {
            if scenario != self.scenario && update.settings.is_none() {
                self.settings = GameSettings::for_scenario(scenario);
            }
            self.scenario = scenario;
        }
        if let Some(settings) = update.settings {
            self.settings = settings;
        }
        if let Some(ruleset) = update.ruleset {
            self.ruleset = ruleset;
        }
    }
}

/// A host's lobby edit. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LobbyUpdate {
    pub scenario: Option<Scenario>,
    pub settings: Option<GameSettings>,
    pub ruleset: Option<RulesetChoice>,
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby → InGame → Closed
/// ```
///
/// A finished game keeps the room `InGame` so members can still browse the
/// post-game table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Lobby,
    InGame,
    Closed,
}

impl RoomState {
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::InGame => write!(f, "in_game"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use bunker_engine::{ContinuePermission, RulesetMode};

    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_players, 4);
        assert_eq!(config.max_players, 16);
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.min_players_for(Scenario::DevTest), 1);
        assert!(!config.allow_dev_scenarios);
    }

    #[test]
    fn test_switching_to_sandbox_resets_settings() {
        let mut lobby = LobbySettings::default();
        lobby.apply(LobbyUpdate {
            scenario: Some(Scenario::DevTest),
            ..LobbyUpdate::default()
        });
        assert_eq!(lobby.settings.continue_permission, ContinuePermission::HostOnly);
    }

    #[test]
    fn test_explicit_settings_win_over_scenario_defaults() {
        let mut lobby = LobbySettings::default();
        let settings = GameSettings {
            continue_permission: ContinuePermission::Anyone,
            ..GameSettings::default()
        };
        lobby.apply(LobbyUpdate {
            scenario: Some(Scenario::DevTest),
            settings: Some(settings.clone()),
            ruleset: None,
        });
        assert_eq!(lobby.settings, settings);
    }

    #[test]
    fn test_ruleset_choice_resolves_for_roster() {
        assert_eq!(RulesetChoice::Auto.resolve(6).ruleset_mode, RulesetMode::Auto);
        assert_eq!(RulesetChoice::Auto.resolve(6).bunker_seats, 3);

        let manual = RulesetChoice::Manual(ManualRulesConfig {
            bunker_slots: 2,
            votes_by_round: vec![1, 1],
            ..ManualRulesConfig::default()
        });
        let ruleset = manual.resolve(5);
        assert_eq!(ruleset.ruleset_mode, RulesetMode::Manual);
        assert_eq!(ruleset.total_exiles, 3);
    }

    #[test]
    fn test_lobby_update_json() {
        let update: LobbyUpdate = serde_json::from_str(
            r#"{"scenario":"dev_test","ruleset":{"mode":"manual","bunkerSlots":3,"votesByRound":[1]}}"#,
        )
        .unwrap();
        assert_eq!(update.scenario, Some(Scenario::DevTest));
        assert!(matches!(update.ruleset, Some(RulesetChoice::Manual(ref c)) if c.bunker_slots == 3));
        assert!(update.settings.is_none());
    }
}
