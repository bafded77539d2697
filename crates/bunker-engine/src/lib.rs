//! The bunker game session engine.
//!
//! A session enacts one game: dealing hands and abilities, reveal turns
//! with optional discussion timers, weighted voting with an ability window
//! and a single tie-break revote, eliminations with their triggered
//! abilities, and the post-game.
//!
//! # Key types
//!
//! - [`GameEngine`]: what a room drives; one boxed engine per running game
//! - [`GameSession`]: the classic rules
//! - [`DevTestSession`]: the sandbox decorator with self-playing bots
//! - [`SessionSetup`]: roster, catalogs, settings, seed and clock for a new game
//! - [`GameView`]: the per-viewer projection sent to clients
//! - [`GameError`]: why an action was rejected
//!
//! Sessions are synchronous and own no tasks or timers. The room layer
//! serialises calls and turns [`GameEngine::current_timer`] into a real
//! deadline.

mod clock;
mod dev;
mod engine;
mod error;
mod model;
mod ruleset;
mod session;
mod settings;
mod view;
mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dev::{DEV_BUNKER_CAPACITY, DevTestSession};
pub use engine::{
    GameEngine, NoPresence, PlayerPresence, RoomContext, SeatedPlayer, SessionSetup, start_session,
};
pub use error::{GameError, GameErrorKind};
pub use model::{
    ArmedTimer, BallotStatus, EffectiveVote, GamePlayer, HandCard, MISSING_CARD_LABEL, Phase,
    PlayerStatus, PostGameState, RoundRules, SpecialState, TimerKind, VotePhase, VoteRecord,
};
pub use ruleset::{
    GameRuleset, MAX_CLASSIC_PLAYERS, MIN_CLASSIC_PLAYERS, ManualRulesConfig, RulesetMode,
};
pub use session::GameSession;
pub use settings::{
    ContinuePermission, FinalThreatReveal, GameSettings, RevealTimeoutAction, Scenario,
    SpecialUsage,
};
pub use view::{
    ASSET_URL_PREFIX, CardView, EffectView, GameView, PublicCategoryCard, PublicCategorySlot,
    PublicPlayerView, PublicView, RoundRulesView, SlotStatus, SpecialView, TimerView, VotePublic,
    VotingProgress, VotingView, YouCategoryCard, YouCategorySlot, YouView,
};
pub use world::{
    FacedWorldCard, ThreatModifier, ThreatModifierTable, WorldCard, WorldCounts, WorldEvent,
    WorldEventKind, WorldState, world_counts,
};
