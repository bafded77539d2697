//! Unified error type for the bunker server.

use bunker_catalog::CatalogError;
use bunker_engine::GameError;
use bunker_protocol::ProtocolError;
use bunker_room::RoomError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum BunkerError {
    /// Encode, decode, or an invalid frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Deck or ability files could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The game refused an action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Room not found, full, wrong state, or gone.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl BunkerError {
    /// The engine's rejection, wherever it was wrapped.
    pub fn game_error(&self) -> Option<&GameError> {
        match self {
            Self::Game(err) | Self::Room(RoomError::GameRejected(err)) => Some(err),
            _ => None,
        }
    }
}
