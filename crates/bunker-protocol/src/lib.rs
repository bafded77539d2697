//! Wire-facing vocabulary for the bunker game engine.
//!
//! This crate defines what callers send to a game session and what they
//! get back, independent of any transport:
//!
//! - **Identities** ([`PlayerId`], [`RoomCode`]) and delivery targets
//!   ([`Recipient`]).
//! - **Actions** ([`GameAction`], [`SpecialPayload`]): the closed set of
//!   things a player or the room can ask a session to do.
//! - **Results** ([`ActionOutcome`], [`ActionResult`], [`GameEvent`]):
//!   what a session reports after applying an action or a timer expiry.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (GameAction) → Room actor → Engine
//! ```

mod action;
mod codec;
mod error;
mod event;
mod types;

pub use action::{BunkerOutcome, GameAction, NeighborSide, SpecialPayload};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{ActionOutcome, ActionResult, EventKind, GameEvent};
pub use types::{PlayerId, Recipient, RoomCode};
