//! Error types for the game engine.

use std::fmt;

/// Why an action or timer expiry was rejected.
///
/// Every variant is recoverable: the session is left untouched and the
/// message is shown to the acting player only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Unknown actor, card, ability instance or vote target.
    #[error("{0}")]
    NotFound(String),

    /// Wrong turn, wrong role, or a continuation policy violation.
    #[error("{0}")]
    PermissionDenied(String),

    /// The action is not valid in the current phase or vote sub-phase.
    #[error("{0}")]
    PhaseMismatch(String),

    /// An ability requirement or effect precondition failed.
    #[error("{0}")]
    PreconditionUnmet(String),

    /// Already revealed, already voted, already used, already decided.
    #[error("{0}")]
    Conflict(String),

    /// Unknown action for this engine, or an unsupported effect kind.
    #[error("{0}")]
    Unsupported(String),
}

/// The category of a [`GameError`], for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameErrorKind {
    NotFound,
    PermissionDenied,
    PhaseMismatch,
    PreconditionUnmet,
    Conflict,
    Unsupported,
}

impl GameError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn phase(msg: impl Into<String>) -> Self {
        Self::PhaseMismatch(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionUnmet(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn kind(&self) -> GameErrorKind {
        match self {
            Self::NotFound(_) => GameErrorKind::NotFound,
            Self::PermissionDenied(_) => GameErrorKind::PermissionDenied,
            Self::PhaseMismatch(_) => GameErrorKind::PhaseMismatch,
            Self::PreconditionUnmet(_) => GameErrorKind::PreconditionUnmet,
            Self::Conflict(_) => GameErrorKind::Conflict,
            Self::Unsupported(_) => GameErrorKind::Unsupported,
        }
    }

    /// The caller-visible message.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::PermissionDenied(m)
            | Self::PhaseMismatch(m)
            | Self::PreconditionUnmet(m)
            | Self::Conflict(m)
            | Self::Unsupported(m) => m,
        }
    }
}

impl fmt::Display for GameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::PhaseMismatch => "phase_mismatch",
            Self::PreconditionUnmet => "precondition_unmet",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_message() {
        let err = GameError::conflict("Card already revealed.");
        assert_eq!(err.to_string(), "Card already revealed.");
        assert_eq!(err.kind(), GameErrorKind::Conflict);
        assert_eq!(err.kind().to_string(), "conflict");
    }
}
