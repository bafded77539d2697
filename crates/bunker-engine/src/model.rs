//! Session-internal state records: phases, players, hands, abilities, votes.

use std::collections::BTreeSet;
use std::fmt;

use bunker_catalog::{CategoryKey, FactSlot, SpecialDefinition};
use bunker_protocol::{BunkerOutcome, PlayerId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The top-level phase of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Reveal,
    RevealDiscussion,
    Voting,
    Resolution,
    Ended,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reveal => "reveal",
            Self::RevealDiscussion => "reveal_discussion",
            Self::Voting => "voting",
            Self::Resolution => "resolution",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sub-phase of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VotePhase {
    /// Ballots are being collected.
    #[serde(rename = "voting")]
    Voting,
    /// Every alive player has voted; vote-only abilities may still fire.
    #[serde(rename = "voteSpecialWindow")]
    SpecialWindow,
    /// The vote has been counted.
    #[serde(rename = "voteResolve")]
    Resolve,
}

impl VotePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::SpecialWindow => "voteSpecialWindow",
            Self::Resolve => "voteResolve",
        }
    }
}

impl fmt::Display for VotePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's standing. Only ever moves away from `Alive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Alive,
    Eliminated,
    LeftBunker,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Eliminated => "eliminated",
            Self::LeftBunker => "left_bunker",
        }
    }

    pub fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Label shown for a slot whose deck ran dry while dealing.
pub const MISSING_CARD_LABEL: &str = "Нет карты";

/// One dealt card in a hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandCard {
    /// `{playerId}-{n}`; unique within the session and never reused.
    pub instance_id: String,
    /// Asset id of the card face; empty for a missing card.
    pub card_id: String,
    pub deck: String,
    pub slot: Option<FactSlot>,
    pub label: String,
    pub revealed: bool,
    pub missing: bool,
}

impl HandCard {
    pub fn is_in(&self, category: CategoryKey) -> bool {
        category.matches(&self.deck, self.slot)
    }
}

/// A dealt ability instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialState {
    /// `special-{playerId}-{n}`, unique within the session.
    pub instance_id: String,
    pub definition: SpecialDefinition,
    pub revealed_public: bool,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct GamePlayer {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    pub hand: Vec<HandCard>,
    pub specials: Vec<SpecialState>,
    pub is_bot: bool,
    /// Players who may never vote against this player.
    pub banned_against: BTreeSet<PlayerId>,
    /// Set by a fired secret ability; consumed when the next vote opens.
    pub forced_wasted_vote_next: bool,
}

impl GamePlayer {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: PlayerStatus::Alive,
            hand: Vec::new(),
            specials: Vec::new(),
            is_bot: false,
            banned_against: BTreeSet::new(),
            forced_wasted_vote_next: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    pub fn has_hidden_cards(&self) -> bool {
        self.hand.iter().any(|c| !c.revealed)
    }

    pub fn has_revealed_special(&self) -> bool {
        self.specials.iter().any(|s| s.revealed_public)
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// A ballot as submitted (or as forced by an ability).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    /// `None` for a wasted ballot.
    pub target: Option<PlayerId>,
    pub submitted_at: i64,
    pub is_valid: bool,
    pub reason: Option<String>,
}

/// How a ballot counts after every modifier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotStatus {
    NotVoted,
    Voted,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveVote {
    pub status: BallotStatus,
    pub target: Option<PlayerId>,
    pub reason: Option<String>,
    pub weight: i64,
    pub submitted_at: Option<i64>,
}

impl EffectiveVote {
    pub(crate) fn not_voted() -> Self {
        Self {
            status: BallotStatus::NotVoted,
            target: None,
            reason: None,
            weight: 0,
            submitted_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Timers, round rules, post-game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Reveal-turn timeout in `reveal`, discussion countdown in `reveal_discussion`.
    RevealDiscussion,
    PreVote,
    PostVote,
    ResolutionAuto,
}

impl TimerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RevealDiscussion => "reveal_discussion",
            Self::PreVote => "pre_vote",
            Self::PostVote => "post_vote",
            Self::ResolutionAuto => "resolution_auto",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single outstanding deadline of a session.
///
/// `version` grows with every arming; an expiry carrying an older version
/// is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub kind: TimerKind,
    /// Milliseconds since the Unix epoch.
    pub ends_at: i64,
    pub version: u64,
}

/// Round-scoped rules imposed by abilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundRules {
    pub no_talk_until_voting: bool,
    pub forced_category: Option<CategoryKey>,
}

impl RoundRules {
    pub fn is_empty(&self) -> bool {
        !self.no_talk_until_voting && self.forced_category.is_none()
    }
}

/// Post-game sub-phase opened when the game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostGameState {
    pub is_active: bool,
    pub entered_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BunkerOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<i64>,
}

impl PostGameState {
    pub fn open(now_ms: i64) -> Self {
        Self {
            is_active: true,
            entered_at: now_ms,
            outcome: None,
            decided_by: None,
            decided_at: None,
        }
    }

    /// Players may still flip their own cards until the host decides.
    pub fn accepts_reveals(&self) -> bool {
        self.is_active && self.outcome.is_none()
    }
}
