//! The closed action vocabulary a game session understands.
//!
//! Every request a client (or the room on its behalf) can make of a
//! running session is one variant of [`GameAction`]. Adding an action
//! means adding a variant, and every `match` over actions in the engine
//! then fails to compile until it handles it.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

// ---------------------------------------------------------------------------
// GameAction
// ---------------------------------------------------------------------------

/// One player-initiated request against a game session.
///
/// Adjacently tagged on the wire:
///
/// ```text
/// { "type": "vote", "payload": { "targetPlayerId": "p3" } }
/// { "type": "continueRound" }
/// ```
///
/// Optional payload fields may be omitted or sent empty; the engine treats
/// both as "not supplied".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum GameAction {
    /// Reveal one of the actor's own hidden hand cards.
    RevealCard { card_id: String },

    /// Advance out of discussion or resolution.
    ContinueRound,

    /// Cast a vote against another alive player.
    Vote { target_player_id: PlayerId },

    /// Close the special window and resolve the vote (host/control only).
    FinalizeVoting,

    /// Activate one of the actor's special ability instances.
    ApplySpecial {
        special_instance_id: String,
        #[serde(default)]
        payload: SpecialPayload,
    },

    /// Reveal a world threat card after the game has ended.
    RevealWorldThreat { index: i64 },

    /// Record the final bunker outcome (host only, once).
    SetBunkerOutcome { outcome: BunkerOutcome },

    /// Dev sandbox: jump to the next round.
    DevSkipRound,

    /// Eliminate a player by hand.
    DevKickPlayer {
        #[serde(default)]
        target_player_id: Option<PlayerId>,
    },

    /// Dev sandbox: add a bot player.
    DevAddPlayer {
        #[serde(default)]
        name: Option<String>,
    },

    /// Dev sandbox: remove a player (defaults to the last bot).
    DevRemovePlayer {
        #[serde(default)]
        target_player_id: Option<PlayerId>,
    },

    /// Mark a player as having left the bunker.
    MarkLeftBunker {
        #[serde(default)]
        target_player_id: Option<PlayerId>,
    },
}

impl GameAction {
    /// The wire name of this action, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RevealCard { .. } => "revealCard",
            Self::ContinueRound => "continueRound",
            Self::Vote { .. } => "vote",
            Self::FinalizeVoting => "finalizeVoting",
            Self::ApplySpecial { .. } => "applySpecial",
            Self::RevealWorldThreat { .. } => "revealWorldThreat",
            Self::SetBunkerOutcome { .. } => "setBunkerOutcome",
            Self::DevSkipRound => "devSkipRound",
            Self::DevKickPlayer { .. } => "devKickPlayer",
            Self::DevAddPlayer { .. } => "devAddPlayer",
            Self::DevRemovePlayer { .. } => "devRemovePlayer",
            Self::MarkLeftBunker { .. } => "markLeftBunker",
        }
    }

    /// Returns `true` for actions only the room's control role may send.
    ///
    /// The room layer enforces this before the action reaches the engine.
    pub fn is_control_only(&self) -> bool {
        matches!(
            self,
            Self::FinalizeVoting
                | Self::SetBunkerOutcome { .. }
                | Self::DevSkipRound
                | Self::DevKickPlayer { .. }
                | Self::DevAddPlayer { .. }
                | Self::DevRemovePlayer { .. }
                | Self::MarkLeftBunker { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// SpecialPayload
// ---------------------------------------------------------------------------

/// The parameter bag sent with [`GameAction::ApplySpecial`].
///
/// Which fields matter depends on the ability's targeting: player abilities
/// read `target_player_id`, neighbor abilities accept either an id or a
/// `side`, category abilities read `category`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<PlayerId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<NeighborSide>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SpecialPayload {
    /// The target id, ignoring blank strings.
    pub fn target(&self) -> Option<&PlayerId> {
        self.target_player_id.as_ref().filter(|id| !id.is_blank())
    }

    /// The category choice, ignoring blank strings.
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Returns `true` when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.target().is_none() && self.side.is_none() && self.category().is_none()
    }
}

/// Which neighbor a neighbor-targeted ability points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborSide {
    Left,
    Right,
}

/// The host's final verdict on the bunker, recorded after the game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BunkerOutcome {
    Survived,
    Failed,
}
