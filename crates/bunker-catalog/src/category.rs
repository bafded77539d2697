//! Card categories and the decks they are dealt from.
//!
//! Players and abilities refer to categories in several spellings: the
//! machine key (`health`), the display label (`Здоровье`, `Факт №1`) or
//! the deck name (`Факты`). [`CategoryKey::resolve`] accepts all of them.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const PROFESSION_DECK: &str = "Профессия";
pub const HEALTH_DECK: &str = "Здоровье";
pub const HOBBY_DECK: &str = "Хобби";
pub const BAGGAGE_DECK: &str = "Багаж";
pub const FACTS_DECK: &str = "Факты";
pub const BIOLOGY_DECK: &str = "Биология";

/// Decks that deal exactly one card into every hand, in hand order.
pub const CORE_DECKS: [&str; 5] = [
    PROFESSION_DECK,
    HEALTH_DECK,
    HOBBY_DECK,
    BAGGAGE_DECK,
    BIOLOGY_DECK,
];

/// Display label of the last public category, which lists abilities.
pub const SPECIAL_CATEGORY_LABEL: &str = "Особые условия";

/// Category display order shared by every view.
pub const CATEGORY_ORDER: [&str; 8] = [
    "Профессия",
    "Здоровье",
    "Хобби",
    "Багаж",
    "Факт №1",
    "Факт №2",
    "Биология",
    SPECIAL_CATEGORY_LABEL,
];

// ---------------------------------------------------------------------------
// FactSlot
// ---------------------------------------------------------------------------

/// Which of the two fact cards a hand card occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactSlot {
    #[serde(rename = "facts1")]
    First,
    #[serde(rename = "facts2")]
    Second,
}

impl FactSlot {
    pub const ALL: [FactSlot; 2] = [FactSlot::First, FactSlot::Second];
}

// ---------------------------------------------------------------------------
// CategoryKey
// ---------------------------------------------------------------------------

/// A card category.
///
/// `Facts` covers both fact slots; `Facts1`/`Facts2` pin one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryKey {
    Profession,
    Health,
    Hobby,
    Baggage,
    Facts,
    Facts1,
    Facts2,
    Biology,
}

impl CategoryKey {
    /// Hand categories in display order, one per visible category slot.
    pub const DISPLAY_ORDER: [CategoryKey; 7] = [
        CategoryKey::Profession,
        CategoryKey::Health,
        CategoryKey::Hobby,
        CategoryKey::Baggage,
        CategoryKey::Facts1,
        CategoryKey::Facts2,
        CategoryKey::Biology,
    ];

    const ALL: [CategoryKey; 8] = [
        CategoryKey::Profession,
        CategoryKey::Health,
        CategoryKey::Hobby,
        CategoryKey::Baggage,
        CategoryKey::Facts,
        CategoryKey::Facts1,
        CategoryKey::Facts2,
        CategoryKey::Biology,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profession => "profession",
            Self::Health => "health",
            Self::Hobby => "hobby",
            Self::Baggage => "baggage",
            Self::Facts => "facts",
            Self::Facts1 => "facts1",
            Self::Facts2 => "facts2",
            Self::Biology => "biology",
        }
    }

    pub fn deck_name(self) -> &'static str {
        match self {
            Self::Profession => PROFESSION_DECK,
            Self::Health => HEALTH_DECK,
            Self::Hobby => HOBBY_DECK,
            Self::Baggage => BAGGAGE_DECK,
            Self::Facts | Self::Facts1 | Self::Facts2 => FACTS_DECK,
            Self::Biology => BIOLOGY_DECK,
        }
    }

    pub fn slot(self) -> Option<FactSlot> {
        match self {
            Self::Facts1 => Some(FactSlot::First),
            Self::Facts2 => Some(FactSlot::Second),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Profession => "Профессия",
            Self::Health => "Здоровье",
            Self::Hobby => "Хобби",
            Self::Baggage => "Багаж",
            Self::Facts | Self::Facts1 => "Факт №1",
            Self::Facts2 => "Факт №2",
            Self::Biology => "Биология",
        }
    }

    /// Returns `true` if a card from `deck` in `slot` belongs to this category.
    pub fn matches(self, deck: &str, slot: Option<FactSlot>) -> bool {
        deck == self.deck_name() && self.slot().is_none_or(|wanted| slot == Some(wanted))
    }

    /// Resolves any accepted spelling to a category.
    ///
    /// Lookup order: exact key, normalised key, display label (so
    /// `Факт №1` pins the first slot), then deck name (so `Факты` means
    /// either fact).
    pub fn resolve(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(key) = Self::ALL.into_iter().find(|k| k.as_str() == raw) {
            return Some(key);
        }
        let normalized = normalize_key(raw);
        if normalized.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|k| normalize_key(k.as_str()) == normalized)
            .or_else(|| {
                Self::DISPLAY_ORDER
                    .into_iter()
                    .find(|k| normalize_key(k.label()) == normalized)
            })
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|k| normalize_key(k.deck_name()) == normalized)
            })
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CategoryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::resolve(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown category {raw:?}")))
    }
}

/// Lowercases, folds `ё` to `е`, and keeps only letters and digits.
pub fn normalize_key(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace('ё', "е")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}
