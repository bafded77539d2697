//! Rulesets: how many votes each round holds and when the game ends.

use serde::{Deserialize, Serialize};

pub const MIN_CLASSIC_PLAYERS: u32 = 4;
pub const MAX_CLASSIC_PLAYERS: u32 = 16;

const MANUAL_MAX_ROUNDS: usize = 64;
const MANUAL_MAX_VOTES_PER_ROUND: u32 = 9;
const MANUAL_MIN_TARGET_REVEALS: u32 = 5;
const MANUAL_MAX_TARGET_REVEALS: u32 = 7;
const MANUAL_DEFAULT_TARGET_REVEALS: u32 = 7;

/// `(players, votes per round, exile budget, bunker seats)`.
const PRESETS: [(u32, [u32; 5], u32, u32); 13] = [
    (4, [0, 0, 0, 1, 1], 2, 2),
    (5, [0, 0, 1, 1, 1], 3, 2),
    (6, [0, 0, 1, 1, 1], 3, 3),
    (7, [0, 1, 1, 1, 1], 4, 3),
    (8, [0, 1, 1, 1, 1], 4, 4),
    (9, [0, 1, 1, 1, 2], 5, 4),
    (10, [0, 1, 1, 1, 2], 5, 5),
    (11, [0, 1, 1, 2, 2], 6, 5),
    (12, [0, 1, 1, 2, 2], 6, 6),
    (13, [0, 1, 2, 2, 2], 7, 6),
    (14, [0, 1, 2, 2, 2], 7, 7),
    (15, [0, 2, 2, 2, 2], 8, 7),
    (16, [0, 2, 2, 2, 2], 8, 8),
];

/// How a ruleset was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesetMode {
    Preset,
    Auto,
    Manual,
}

/// A host-authored ruleset, before and after normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRulesConfig {
    #[serde(default)]
    pub bunker_slots: u32,
    #[serde(default)]
    pub votes_by_round: Vec<u32>,
    #[serde(default)]
    pub target_reveals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_template_players: Option<u32>,
}

impl ManualRulesConfig {
    /// A manual config pre-filled from the preset for `players`.
    pub fn from_preset(players: u32) -> Self {
        let preset = GameRuleset::preset(players);
        Self {
            bunker_slots: preset.bunker_seats.clamp(1, MAX_CLASSIC_PLAYERS),
            votes_by_round: normalize_votes(&preset.votes_per_round),
            target_reveals: MANUAL_DEFAULT_TARGET_REVEALS,
            seed_template_players: Some(players.clamp(MIN_CLASSIC_PLAYERS, MAX_CLASSIC_PLAYERS)),
        }
    }

    /// Clamps every field into its allowed range.
    ///
    /// `fallback_template` stands in for a missing template player count.
    pub fn normalized(&self, fallback_template: u32) -> Self {
        let template = self
            .seed_template_players
            .unwrap_or(fallback_template)
            .clamp(MIN_CLASSIC_PLAYERS, MAX_CLASSIC_PLAYERS);
        let target_reveals = match self.target_reveals {
            0 => MANUAL_DEFAULT_TARGET_REVEALS,
            n => n,
        }
        .clamp(MANUAL_MIN_TARGET_REVEALS, MANUAL_MAX_TARGET_REVEALS);

        Self {
            bunker_slots: self.bunker_slots.clamp(1, MAX_CLASSIC_PLAYERS),
            votes_by_round: normalize_votes(&self.votes_by_round),
            target_reveals,
            seed_template_players: Some(template),
        }
    }
}

fn normalize_votes(votes: &[u32]) -> Vec<u32> {
    let out: Vec<u32> = votes
        .iter()
        .take(MANUAL_MAX_ROUNDS)
        .map(|v| (*v).min(MANUAL_MAX_VOTES_PER_ROUND))
        .collect();
    if out.is_empty() { vec![0] } else { out }
}

/// The vote schedule and end conditions of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRuleset {
    pub player_count: u32,
    /// Entry `r - 1` is the number of eliminations voted in round `r`.
    pub votes_per_round: Vec<u32>,
    pub total_exiles: u32,
    pub bunker_seats: u32,
    pub ruleset_mode: RulesetMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_config: Option<ManualRulesConfig>,
}

impl GameRuleset {
    /// The preset for `players`, clamped to the supported table.
    pub fn preset(players: u32) -> Self {
        let count = players.clamp(MIN_CLASSIC_PLAYERS, MAX_CLASSIC_PLAYERS);
        let (player_count, votes, total_exiles, bunker_seats) = PRESETS
            .iter()
            .copied()
            .find(|(n, ..)| *n == count)
            .unwrap_or(PRESETS[0]);
        Self {
            player_count,
            votes_per_round: votes.to_vec(),
            total_exiles,
            bunker_seats,
            ruleset_mode: RulesetMode::Preset,
            manual_config: None,
        }
    }

    /// The preset for the actual roster size.
    pub fn auto(players: u32) -> Self {
        Self {
            ruleset_mode: RulesetMode::Auto,
            ..Self::preset(players)
        }
    }

    /// Builds a ruleset from a host-authored config.
    ///
    /// The exile budget is whatever leaves exactly `bunker_slots` alive.
    pub fn manual(config: &ManualRulesConfig, players: u32) -> Self {
        let normalized = config.normalized(players);
        let player_count = players.clamp(MIN_CLASSIC_PLAYERS, MAX_CLASSIC_PLAYERS);
        Self {
            player_count,
            votes_per_round: normalized.votes_by_round.clone(),
            total_exiles: player_count.min(64).saturating_sub(normalized.bunker_slots),
            bunker_seats: normalized.bunker_slots,
            ruleset_mode: RulesetMode::Manual,
            manual_config: Some(normalized),
        }
    }

    /// Eliminations scheduled for 1-based `round`; zero outside the schedule.
    pub fn votes_for_round(&self, round: u32) -> u32 {
        round
            .checked_sub(1)
            .and_then(|i| self.votes_per_round.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn rounds(&self) -> u32 {
        self.votes_per_round.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_table_rows() {
        let four = GameRuleset::preset(4);
        assert_eq!(four.votes_per_round, vec![0, 0, 0, 1, 1]);
        assert_eq!((four.total_exiles, four.bunker_seats), (2, 2));

        let eleven = GameRuleset::preset(11);
        assert_eq!(eleven.votes_per_round, vec![0, 1, 1, 2, 2]);
        assert_eq!((eleven.total_exiles, eleven.bunker_seats), (6, 5));
    }

    #[test]
    fn test_preset_clamps_player_count() {
        assert_eq!(GameRuleset::preset(2).player_count, 4);
        assert_eq!(GameRuleset::preset(40).bunker_seats, 8);
        assert_eq!(GameRuleset::auto(6).ruleset_mode, RulesetMode::Auto);
    }

    #[test]
    fn test_manual_clamps_fields() {
        let config = ManualRulesConfig {
            bunker_slots: 0,
            votes_by_round: vec![0, 12, 3],
            target_reveals: 0,
            seed_template_players: Some(30),
        };
        let ruleset = GameRuleset::manual(&config, 6);
        assert_eq!(ruleset.votes_per_round, vec![0, 9, 3]);
        assert_eq!(ruleset.bunker_seats, 1);
        assert_eq!(ruleset.total_exiles, 5);
        let manual = ruleset.manual_config.unwrap();
        assert_eq!(manual.target_reveals, 7);
        assert_eq!(manual.seed_template_players, Some(16));
    }

    #[test]
    fn test_manual_empty_schedule_gets_one_round() {
        let ruleset = GameRuleset::manual(&ManualRulesConfig::default(), 5);
        assert_eq!(ruleset.votes_per_round, vec![0]);
        assert_eq!(ruleset.rounds(), 1);
    }

    #[test]
    fn test_manual_schedule_is_capped_at_64_rounds() {
        let config = ManualRulesConfig {
            bunker_slots: 2,
            votes_by_round: vec![1; 100],
            ..Default::default()
        };
        assert_eq!(GameRuleset::manual(&config, 8).rounds(), 64);
    }

    #[test]
    fn test_votes_for_round_outside_schedule_is_zero() {
        let ruleset = GameRuleset::preset(9);
        assert_eq!(ruleset.votes_for_round(0), 0);
        assert_eq!(ruleset.votes_for_round(5), 2);
        assert_eq!(ruleset.votes_for_round(6), 0);
    }

    #[test]
    fn test_ruleset_wire_shape() {
        let json = serde_json::to_value(GameRuleset::auto(4)).unwrap();
        assert_eq!(json["rulesetMode"], "auto");
        assert_eq!(json["votesPerRound"], serde_json::json!([0, 0, 0, 1, 1]));
        assert!(json.get("manualConfig").is_none());
    }
}
