//! The `GameEngine` trait: the seam between a room and a running game.
//!
//! A room owns exactly one boxed engine while a game is in progress and
//! serialises every call into it. Two implementations exist:
//! [`GameSession`](crate::GameSession) enacts the classic rules and
//! [`DevTestSession`](crate::DevTestSession) wraps one for the sandbox
//! scenario. [`start_session`] picks the right one for a scenario.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bunker_catalog::{AbilityCatalog, AssetCatalog};
use bunker_protocol::{ActionOutcome, GameAction, PlayerId, RoomCode};

use crate::clock::{Clock, SystemClock};
use crate::dev::DevTestSession;
use crate::model::{ArmedTimer, Phase, PlayerStatus};
use crate::ruleset::GameRuleset;
use crate::session::GameSession;
use crate::settings::{GameSettings, Scenario};
use crate::view::GameView;
use crate::world::ThreatModifierTable;
use crate::GameError;

/// A running game as seen by its room.
///
/// Every method runs to completion without blocking; the caller holds the
/// room's exclusive access for the duration.
pub trait GameEngine: Send {
    /// Applies one player action.
    ///
    /// `Ok` with `state_changed == false` is a valid no-op. An `Err` leaves
    /// the session untouched and is shown to the actor only.
    fn handle_action(&mut self, actor: &PlayerId, action: GameAction) -> Result<ActionOutcome, GameError>;

    /// Fires the armed timer if `version` matches it and `now_ms` has
    /// reached its deadline. Stale or early expiries are no-ops.
    fn handle_timer_expired(&mut self, now_ms: i64, version: u64) -> Result<ActionOutcome, GameError>;

    /// The per-viewer projection. Never mutates the session.
    fn build_game_view(&self, room: &dyn RoomContext, viewer: &PlayerId) -> GameView;

    /// The outstanding deadline, if any. The room re-arms its timer from
    /// this after every call.
    fn current_timer(&self) -> Option<ArmedTimer>;

    /// Called by the room on host transfer.
    fn set_host_id(&mut self, host: PlayerId);

    fn player_status(&self, player: &PlayerId) -> Option<PlayerStatus>;

    fn phase(&self) -> Phase;

    fn scenario(&self) -> Scenario;
}

// ---------------------------------------------------------------------------
// RoomContext
// ---------------------------------------------------------------------------

/// Connection facts the room knows and the engine does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerPresence {
    pub connected: bool,
    pub disconnected_at: Option<i64>,
}

/// What a view needs from the room that owns the session.
pub trait RoomContext {
    /// `None` for players the room no longer tracks.
    fn presence(&self, player: &PlayerId) -> Option<PlayerPresence>;
}

impl RoomContext for BTreeMap<PlayerId, PlayerPresence> {
    fn presence(&self, player: &PlayerId) -> Option<PlayerPresence> {
        self.get(player).copied()
    }
}

impl RoomContext for HashMap<PlayerId, PlayerPresence> {
    fn presence(&self, player: &PlayerId) -> Option<PlayerPresence> {
        self.get(player).copied()
    }
}

/// A room with nobody connected, for headless callers and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresence;

impl RoomContext for NoPresence {
    fn presence(&self, _player: &PlayerId) -> Option<PlayerPresence> {
        None
    }
}

// ---------------------------------------------------------------------------
// SessionSetup
// ---------------------------------------------------------------------------

/// One seat in a new game, in join order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatedPlayer {
    pub id: PlayerId,
    pub name: String,
}

impl SeatedPlayer {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Everything a room hands over when a game starts.
///
/// Catalogs are borrowed: the session takes its own working copies.
pub struct SessionSetup<'a> {
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub scenario: Scenario,
    pub settings: GameSettings,
    /// `None` means the `auto` ruleset for the roster size.
    pub ruleset: Option<GameRuleset>,
    pub players: Vec<SeatedPlayer>,
    pub assets: &'a AssetCatalog,
    pub abilities: &'a AbilityCatalog,
    /// Zero draws a seed from the thread RNG.
    pub seed: u64,
    pub clock: Arc<dyn Clock>,
    pub threat_table: ThreatModifierTable,
}

impl<'a> SessionSetup<'a> {
    pub fn new(
        room_code: RoomCode,
        host_id: PlayerId,
        players: Vec<SeatedPlayer>,
        assets: &'a AssetCatalog,
        abilities: &'a AbilityCatalog,
    ) -> Self {
        Self {
            room_code,
            host_id,
            scenario: Scenario::Classic,
            settings: GameSettings::default(),
            ruleset: None,
            players,
            assets,
            abilities,
            seed: 0,
            clock: Arc::new(SystemClock),
            threat_table: ThreatModifierTable::default(),
        }
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_ruleset(mut self, ruleset: GameRuleset) -> Self {
        self.ruleset = Some(ruleset);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_threat_table(mut self, table: ThreatModifierTable) -> Self {
        self.threat_table = table;
        self
    }
}

/// Starts a game, wrapping it in the sandbox decorator for `dev_test`.
pub fn start_session(setup: SessionSetup<'_>) -> Box<dyn GameEngine> {
    let scenario = setup.scenario;
    let session = GameSession::new(setup);
    if scenario.is_dev() {
        Box::new(DevTestSession::new(session))
    } else {
        Box::new(session)
    }
}
