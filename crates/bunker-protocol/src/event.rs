//! Events and action results reported by a game session.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// A notable thing that happened in a session, shown to every member.
///
/// Event ids are `{room}-{counter}` and never repeat within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub id: String,
    pub kind: EventKind,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// The category of a [`GameEvent`], used by clients for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Info,
    RoundStart,
    VotingStart,
    Elimination,
    GameEnd,
    PlayerLeftBunker,
}

// ---------------------------------------------------------------------------
// ActionOutcome / ActionResult
// ---------------------------------------------------------------------------

/// The successful result of applying an action or a timer expiry.
///
/// `state_changed == false` with no events is a valid no-op (a stale
/// timer, a trigger check that found nothing to do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub state_changed: bool,
    pub events: Vec<GameEvent>,
}

impl ActionOutcome {
    /// Nothing happened.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// State changed, with these events.
    pub fn changed(events: Vec<GameEvent>) -> Self {
        Self {
            state_changed: true,
            events,
        }
    }

    /// Folds another outcome into this one, keeping event order.
    pub fn merge(&mut self, other: ActionOutcome) {
        self.state_changed |= other.state_changed;
        self.events.extend(other.events);
    }
}

/// The wire form of an action result: `{stateChanged, events, error?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub state_changed: bool,
    pub events: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// A rejected action: no state change, no events, just the message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state_changed: false,
            events: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<ActionOutcome> for ActionResult {
    fn from(outcome: ActionOutcome) -> Self {
        Self {
            state_changed: outcome.state_changed,
            events: outcome.events,
            error: None,
        }
    }
}
