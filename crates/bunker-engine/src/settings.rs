//! Host-editable game settings and the scenario a room runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which rule set a room plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Classic,
    /// Sandbox with bots and relaxed end conditions.
    DevTest,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::DevTest => "dev_test",
        }
    }

    pub fn is_dev(self) -> bool {
        matches!(self, Self::DevTest)
    }

    /// Parses a scenario id, accepting surrounding whitespace and any case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "dev_test" => Some(Self::DevTest),
            _ => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may advance out of discussion and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuePermission {
    Anyone,
    HostOnly,
    /// The last revealer during reveal discussion, the host otherwise.
    RevealerOnly,
}

/// What happens when a reveal turn times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealTimeoutAction {
    RandomCard,
    SkipPlayer,
}

/// When abilities may be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialUsage {
    Anytime,
    OnlyDuringVoting,
}

/// Who may reveal world threats after the game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalThreatReveal {
    Host,
    Anyone,
}

/// Per-room settings, edited by the host in the lobby.
///
/// Missing fields in a JSON update keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub enable_reveal_discussion_timer: bool,
    pub reveal_discussion_seconds: u32,
    pub enable_pre_vote_discussion_timer: bool,
    pub pre_vote_discussion_seconds: u32,
    pub enable_post_vote_discussion_timer: bool,
    pub post_vote_discussion_seconds: u32,
    pub enable_presenter_mode: bool,
    pub continue_permission: ContinuePermission,
    pub reveal_timeout_action: RevealTimeoutAction,
    /// Informational only.
    pub reveals_before_voting: u32,
    pub special_usage: SpecialUsage,
    pub max_players: u32,
    pub final_threat_reveal: FinalThreatReveal,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            enable_reveal_discussion_timer: false,
            reveal_discussion_seconds: 60,
            enable_pre_vote_discussion_timer: false,
            pre_vote_discussion_seconds: 60,
            enable_post_vote_discussion_timer: false,
            post_vote_discussion_seconds: 45,
            enable_presenter_mode: false,
            continue_permission: ContinuePermission::RevealerOnly,
            reveal_timeout_action: RevealTimeoutAction::RandomCard,
            reveals_before_voting: 2,
            special_usage: SpecialUsage::Anytime,
            max_players: 12,
            final_threat_reveal: FinalThreatReveal::Host,
        }
    }
}

impl GameSettings {
    /// Defaults for a scenario; the sandbox lets only the host advance.
    pub fn for_scenario(scenario: Scenario) -> Self {
        let mut settings = Self::default();
        if scenario.is_dev() {
            settings.continue_permission = ContinuePermission::HostOnly;
        }
        settings
    }
}
