//! World cards: the disaster, the bunker cards revealed one per round, and
//! the threats that may be turned over once the game has ended.

use std::collections::BTreeMap;

use bunker_catalog::DeckPools;
use bunker_protocol::PlayerId;
use rand::Rng;
use serde::Serialize;

/// `(min players, max players, bunker cards, threat cards)`.
const WORLD_COUNTS: [(usize, usize, usize, usize); 4] = [
    (4, 4, 5, 3),
    (5, 6, 5, 4),
    (7, 9, 5, 5),
    (10, 16, 5, 6),
];

const BUNKER_DECK_KEYWORD: &str = "бункер";
const DISASTER_DECK_KEYWORD: &str = "катастроф";
const THREAT_DECK_KEYWORD: &str = "угроз";

/// Bunker and threat counts for a roster size; sizes outside the table use
/// its last row.
pub fn world_counts(players: usize) -> (usize, usize) {
    let row = WORLD_COUNTS
        .iter()
        .find(|(min, max, ..)| (*min..=*max).contains(&players))
        .unwrap_or(&WORLD_COUNTS[WORLD_COUNTS.len() - 1]);
    (row.2, row.3)
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldCard {
    pub kind: String,
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl WorldCard {
    fn drawn(kind: &str, id: String, label: String) -> Self {
        Self {
            kind: kind.to_string(),
            image_id: Some(id.clone()),
            id,
            title: label.clone(),
            description: label,
            text: String::new(),
        }
    }

    fn fallback(kind: &str, id: String, title: String) -> Self {
        Self {
            kind: kind.to_string(),
            id,
            title,
            description: String::new(),
            text: String::new(),
            image_id: None,
        }
    }
}

/// A bunker or threat card, face down until revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacedWorldCard {
    #[serde(flatten)]
    pub card: WorldCard,
    pub is_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_at_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_by: Option<PlayerId>,
}

impl FacedWorldCard {
    fn hidden(card: WorldCard) -> Self {
        Self {
            card,
            is_revealed: false,
            revealed_at_round: None,
            revealed_by: None,
        }
    }

    /// The card as clients may see it: content blanked while face down.
    pub fn masked(&self) -> Self {
        if self.is_revealed {
            return self.clone();
        }
        Self {
            card: WorldCard {
                kind: self.card.kind.clone(),
                id: self.card.id.clone(),
                title: String::new(),
                description: String::new(),
                text: String::new(),
                image_id: None,
            },
            is_revealed: false,
            revealed_at_round: None,
            revealed_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorldCounts {
    pub bunker: usize,
    pub threats: usize,
}

/// Marker for the most recent world change, shown as an animation cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorldEvent {
    #[serde(rename = "type")]
    pub kind: WorldEventKind,
    pub index: usize,
    pub round: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEventKind {
    BunkerRevealed,
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldState {
    pub disaster: WorldCard,
    pub bunker: Vec<FacedWorldCard>,
    pub threats: Vec<FacedWorldCard>,
    pub counts: WorldCounts,
}

impl WorldState {
    /// Draws the disaster, the bunker cards and one spare threat beyond the
    /// table count from decks found by name keyword.
    pub fn roll<R: Rng + ?Sized>(pools: &mut DeckPools, rng: &mut R, players: usize) -> Self {
        let (bunker_count, threat_count) = world_counts(players);
        let bunker_deck = pools.find_deck_by_keyword(BUNKER_DECK_KEYWORD);
        let disaster_deck = pools.find_deck_by_keyword(DISASTER_DECK_KEYWORD);
        let threat_deck = pools.find_deck_by_keyword(THREAT_DECK_KEYWORD);

        let disaster = match draw(pools, disaster_deck.as_deref(), rng) {
            Some((id, label)) => WorldCard::drawn("disaster", id, label),
            None => WorldCard {
                description: "Катастрофа".to_string(),
                ..WorldCard::fallback("disaster", "disaster_fallback".into(), "Катастрофа".into())
            },
        };
        let bunker = draw_many(pools, bunker_deck.as_deref(), "bunker", bunker_count, rng);
        let threats = draw_many(pools, threat_deck.as_deref(), "threat", threat_count + 1, rng);

        Self {
            disaster,
            bunker,
            threats,
            counts: WorldCounts {
                bunker: bunker_count,
                threats: threat_count,
            },
        }
    }

    /// Copy with every face-down card blanked.
    pub fn masked(&self) -> Self {
        Self {
            disaster: self.disaster.clone(),
            bunker: self.bunker.iter().map(FacedWorldCard::masked).collect(),
            threats: self.threats.iter().map(FacedWorldCard::masked).collect(),
            counts: self.counts,
        }
    }

    /// Turns over the first face-down bunker card.
    pub fn reveal_next_bunker(&mut self, round: u32) -> Option<WorldEvent> {
        let (index, card) = self
            .bunker
            .iter_mut()
            .enumerate()
            .find(|(_, c)| !c.is_revealed)?;
        card.is_revealed = true;
        card.revealed_at_round = Some(round);
        Some(WorldEvent {
            kind: WorldEventKind::BunkerRevealed,
            index,
            round,
        })
    }

    /// Turns over every remaining bunker card, stamping them with `round`.
    pub fn reveal_all_bunker(&mut self, round: u32) {
        for card in self.bunker.iter_mut().filter(|c| !c.is_revealed) {
            card.is_revealed = true;
            card.revealed_at_round = Some(round);
        }
    }

    pub fn threat_modifier(&self, table: &ThreatModifierTable) -> ThreatModifier {
        let base_count = self.counts.threats;
        let mut delta = 0;
        let mut reasons = Vec::new();
        for card in self.bunker.iter().filter(|c| c.is_revealed) {
            let modifier = table.delta_for(&card.card.title);
            if modifier != 0 {
                delta += modifier;
                reasons.push(card.card.title.clone());
            }
        }
        let final_count = (base_count as i64 + delta).clamp(0, self.threats.len() as i64) as usize;
        ThreatModifier {
            delta,
            reasons,
            base_count,
            final_count,
        }
    }

    /// Turns over threat `index`. Returns `false` if it already was.
    pub fn reveal_threat(&mut self, index: usize, by: &PlayerId) -> bool {
        match self.threats.get_mut(index) {
            Some(card) if !card.is_revealed => {
                card.is_revealed = true;
                card.revealed_by = Some(by.clone());
                true
            }
            _ => false,
        }
    }
}

fn draw<R: Rng + ?Sized>(pools: &mut DeckPools, deck: Option<&str>, rng: &mut R) -> Option<(String, String)> {
    let card = pools.draw(deck?, rng)?;
    Some((card.id, card.label))
}

fn draw_many<R: Rng + ?Sized>(
    pools: &mut DeckPools,
    deck: Option<&str>,
    kind: &str,
    count: usize,
    rng: &mut R,
) -> Vec<FacedWorldCard> {
    (0..count)
        .map(|i| {
            let card = match draw(pools, deck, rng) {
                Some((id, label)) => WorldCard::drawn(kind, id, label),
                None => WorldCard::fallback(
                    kind,
                    format!("{kind}_fallback_{}", i + 1),
                    format!("{kind} #{}", i + 1),
                ),
            };
            FacedWorldCard::hidden(card)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Threat modifier
// ---------------------------------------------------------------------------

/// Revealed bunker card titles that change how many threats count.
///
/// Titles are compared uppercased with whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatModifierTable {
    rules: BTreeMap<String, i64>,
}

impl ThreatModifierTable {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, title: &str, delta: i64) -> Self {
        self.rules.insert(normalize_threat_title(title), delta);
        self
    }

    pub fn delta_for(&self, title: &str) -> i64 {
        self.rules
            .get(&normalize_threat_title(title))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for ThreatModifierTable {
    fn default() -> Self {
        Self::empty()
            .with_rule("ВМЕСТЕ НА 10 ЛЕТ", 1)
            .with_rule("ЗАГАДОЧНЫЙ ЖУРНАЛ", -1)
    }
}

fn normalize_threat_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatModifier {
    pub delta: i64,
    pub reasons: Vec<String>,
    pub base_count: usize,
    /// How many threats may be revealed at the end, within the drawn pool.
    pub final_count: usize,
}
