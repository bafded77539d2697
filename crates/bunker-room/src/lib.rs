//! Room lifecycle for bunker games.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! roster, the host, the lobby settings and, once started, the game engine
//! and its phase timer. Every action and timer expiry for a room goes
//! through that one task, so the engine never sees concurrent calls.
//!
//! # Key types
//!
//! - [`RoomManager`]: allocates room codes, tracks which room each player
//!   is in, routes calls
//! - [`RoomHandle`]: sends commands to a running room actor
//! - [`RoomOutbound`]: what a room pushes to each member
//! - [`RoomConfig`] / [`LobbyUpdate`]: room limits and host-editable setup

mod config;
mod error;
mod manager;
mod room;

pub use config::{GameResources, LobbySettings, LobbyUpdate, RoomConfig, RoomState, RulesetChoice};
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{
    LeaveOutcome, LobbyMember, LobbyView, PlayerSender, RoomHandle, RoomInfo, RoomOutbound,
};
