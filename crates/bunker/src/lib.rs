//! # Bunker
//!
//! Server-authoritative engine for the bunker social deduction game.
//!
//! Players are dealt hidden character cards, reveal them round by round,
//! argue, and vote each other out until only as many remain as the bunker
//! has seats. This crate ties the layers together:
//!
//! ```text
//! frames → Codec → BunkerServer → RoomManager → room actor → GameEngine
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bunker::prelude::*;
//!
//! # async fn run() -> Result<(), BunkerError> {
//! bunker::init_tracing();
//! let server = BunkerServer::new(ServerConfig::from_env());
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let code = server
//!     .rooms()
//!     .lock()
//!     .await
//!     .create_room(PlayerId::new("p1"), "Host", tx)
//!     .await?;
//! println!("room {code} is open");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod server;

pub use config::ServerConfig;
pub use error::BunkerError;
pub use logging::{DEFAULT_LOG_DIRECTIVE, init_tracing};
pub use server::BunkerServer;

pub use bunker_catalog as catalog;
pub use bunker_engine as engine;
pub use bunker_protocol as protocol;
pub use bunker_room as room;
pub use bunker_timer as timer;

pub mod prelude {
    pub use crate::{BunkerError, BunkerServer, ServerConfig, init_tracing};
    pub use bunker_catalog::{AbilityCatalog, AssetCatalog};
    pub use bunker_engine::{
        ContinuePermission, GameEngine, GameError, GameErrorKind, GameSettings, GameView, Phase,
        PlayerStatus, Scenario, VotePhase,
    };
    pub use bunker_protocol::{
        ActionOutcome, ActionResult, BunkerOutcome, Codec, GameAction, GameEvent, JsonCodec, PlayerId,
        RoomCode, SpecialPayload,
    };
    pub use bunker_room::{
        GameResources, LobbyUpdate, RoomConfig, RoomError, RoomManager, RoomOutbound, RulesetChoice,
    };
}
