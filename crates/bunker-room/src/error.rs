//! Error types for the room layer.

use bunker_engine::GameError;
use bunker_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// Wrong lifecycle state or wrong role for this operation, for
    /// example editing settings after the game started.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The running game refused the action. The message is meant for the
    /// acting player only.
    #[error(transparent)]
    GameRejected(#[from] GameError),
}
