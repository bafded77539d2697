//! The card asset catalog and per-session deck pools.
//!
//! Decks are directories under `{root}/decks`; every image file inside a
//! deck directory is one card. The catalog is scanned once at startup and
//! never mutated. Each game session takes a [`DeckPools`] copy and draws
//! from it, so dealing in one room never affects another.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::Rng;

use crate::CatalogError;
use crate::category::{SPECIAL_CATEGORY_LABEL, normalize_key};

const CARD_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Deck directory skipped during scans.
const RESERVED_DECK: &str = "TEMP";

/// One card as known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCard {
    /// Asset path relative to the assets root, e.g. `decks/Хобби/Рыбалка.png`.
    pub id: String,
    pub deck: String,
    /// Short display text: the file name without its extension.
    pub label: String,
}

impl AssetCard {
    /// Builds a card from its deck and file name the same way a scan does.
    pub fn new(deck: impl Into<String>, file_name: &str) -> Self {
        let deck = deck.into();
        let label = match trim_card_extension(file_name).trim() {
            "" => file_name.to_string(),
            stem => stem.to_string(),
        };
        Self {
            id: format!("decks/{deck}/{file_name}"),
            deck,
            label,
        }
    }
}

// ---------------------------------------------------------------------------
// AssetCatalog
// ---------------------------------------------------------------------------

/// Immutable deck name → cards mapping, sorted by card id within a deck.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    decks: BTreeMap<String, Vec<AssetCard>>,
}

impl AssetCatalog {
    /// Scans `{root}/decks` one level deep.
    ///
    /// Sub-directories other than decks, the reserved `TEMP` deck, and
    /// non-image files are ignored. An unreadable deck directory is
    /// skipped with a warning rather than failing the whole scan.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let decks_root = root.as_ref().join("decks");
        let meta = fs::metadata(&decks_root).map_err(|source| CatalogError::Io {
            path: decks_root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(CatalogError::NotADirectory(decks_root));
        }

        let entries = fs::read_dir(&decks_root).map_err(|source| CatalogError::Io {
            path: decks_root.clone(),
            source,
        })?;

        let mut decks = BTreeMap::new();
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let deck_name = entry.file_name().to_string_lossy().into_owned();
            if deck_name.eq_ignore_ascii_case(RESERVED_DECK) {
                continue;
            }
            let files = match fs::read_dir(entry.path()) {
                Ok(files) => files,
                Err(err) => {
                    tracing::warn!(deck = %deck_name, error = %err, "skipping unreadable deck");
                    continue;
                }
            };

            let mut cards: Vec<AssetCard> = files
                .flatten()
                .filter(|file| file.file_type().is_ok_and(|t| t.is_file()))
                .filter_map(|file| {
                    let name = file.file_name().to_string_lossy().into_owned();
                    has_card_extension(&name).then(|| AssetCard::new(deck_name.clone(), &name))
                })
                .collect();
            cards.sort_by(|a, b| a.id.cmp(&b.id));
            decks.insert(deck_name, cards);
        }

        let total: usize = decks.values().map(Vec::len).sum();
        tracing::info!(root = %decks_root.display(), decks = decks.len(), cards = total, "asset catalog loaded");
        Ok(Self { decks })
    }

    /// Builds a catalog from `(deck, file name)` pairs without touching disk.
    pub fn from_files<I, D, F>(files: I) -> Self
    where
        I: IntoIterator<Item = (D, F)>,
        D: Into<String>,
        F: AsRef<str>,
    {
        let mut decks: BTreeMap<String, Vec<AssetCard>> = BTreeMap::new();
        for (deck, file) in files {
            let card = AssetCard::new(deck, file.as_ref());
            decks.entry(card.deck.clone()).or_default().push(card);
        }
        for cards in decks.values_mut() {
            cards.sort_by(|a, b| a.id.cmp(&b.id));
        }
        Self { decks }
    }

    pub fn deck(&self, name: &str) -> &[AssetCard] {
        self.decks.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn deck_names(&self) -> impl Iterator<Item = &str> {
        self.decks.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }

    /// The first deck (in name order) whose normalised name contains `keyword`.
    pub fn find_deck_by_keyword(&self, keyword: &str) -> Option<&str> {
        find_deck(self.deck_names(), keyword)
    }

    /// A fresh, independently drawable copy of every deck.
    pub fn pools(&self) -> DeckPools {
        DeckPools {
            decks: self.decks.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeckPools
// ---------------------------------------------------------------------------

/// A session's private, shrinking copy of the catalog's decks.
#[derive(Debug, Clone, Default)]
pub struct DeckPools {
    decks: BTreeMap<String, Vec<AssetCard>>,
}

impl DeckPools {
    /// Removes and returns a uniformly random card from `deck`.
    ///
    /// Returns `None` when the deck is unknown or exhausted.
    pub fn draw<R: Rng + ?Sized>(&mut self, deck: &str, rng: &mut R) -> Option<AssetCard> {
        let pool = self.decks.get_mut(deck)?;
        if pool.is_empty() {
            return None;
        }
        let index = rng.random_range(0..pool.len());
        Some(pool.swap_remove(index))
    }

    pub fn remaining(&self, deck: &str) -> usize {
        self.decks.get(deck).map_or(0, Vec::len)
    }

    pub fn find_deck_by_keyword(&self, keyword: &str) -> Option<String> {
        find_deck(self.decks.keys().map(String::as_str), keyword).map(str::to_string)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[AssetCard])> {
        self.decks.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn find_deck<'a>(names: impl Iterator<Item = &'a str>, keyword: &str) -> Option<&'a str> {
    let keyword = normalize_deck_key(keyword);
    names
        .into_iter()
        .find(|name| normalize_deck_key(name).contains(&keyword))
}

// ---------------------------------------------------------------------------
// SpecialAssetIndex
// ---------------------------------------------------------------------------

/// Maps the many ways an ability may name its card image to an asset id.
///
/// Built from decks whose name looks like the special-conditions deck.
/// Keys are normalised ids, file names, file stems and labels; the first
/// card to claim a key keeps it.
#[derive(Debug, Clone, Default)]
pub struct SpecialAssetIndex {
    by_key: BTreeMap<String, String>,
}

impl SpecialAssetIndex {
    pub fn build(pools: &DeckPools) -> Self {
        let special_deck_key = normalize_key(SPECIAL_CATEGORY_LABEL);
        let mut index = Self::default();
        for (deck, cards) in pools.iter() {
            let normalized_deck = normalize_key(deck);
            if normalized_deck.is_empty()
                || !(normalized_deck.contains(&special_deck_key)
                    || normalized_deck.contains("special"))
            {
                continue;
            }
            for card in cards.iter().filter(|c| !c.id.is_empty()) {
                let base = leaf_name(&card.id);
                let stem = trim_card_extension(base);
                let candidates = [
                    card.id.as_str(),
                    card.id.strip_prefix("decks/").unwrap_or(&card.id),
                    card.label.as_str(),
                    base,
                    stem,
                ];
                for candidate in candidates {
                    index.insert(candidate, &card.id);
                }
                index.insert(&format!("{deck}/{base}"), &card.id);
                index.insert(&format!("{deck}/{stem}"), &card.id);
            }
        }
        index
    }

    fn insert(&mut self, key: &str, asset_id: &str) {
        let normalized = normalize_asset_ref(key);
        if normalized.is_empty() {
            return;
        }
        self.by_key
            .entry(normalized)
            .or_insert_with(|| asset_id.to_string());
    }

    /// Looks up an asset by the first candidate name that hits.
    pub fn lookup<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Option<&str> {
        candidates.into_iter().find_map(|candidate| {
            let key = normalize_asset_ref(candidate);
            if key.is_empty() {
                return None;
            }
            self.by_key.get(&key).map(String::as_str)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Lowercases, folds `ё`, and strips spaces, underscores and dashes.
pub fn normalize_deck_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('ё', "е")
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect()
}

/// Normalises a declared asset path to the `decks/...` form.
///
/// Returns `None` for blank input.
pub fn normalize_asset_id_path(raw: &str) -> Option<String> {
    let value = raw.trim().replace('\\', "/");
    let mut value = value.trim_start_matches('/');
    if value.is_empty() {
        return None;
    }
    if value
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("assets/"))
    {
        value = &value[7..];
    }
    if value
        .get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("decks/"))
    {
        Some(value.to_string())
    } else {
        Some(format!("decks/{}", value.trim_start_matches('/')))
    }
}

fn normalize_asset_ref(value: &str) -> String {
    let raw = value.trim().replace('\\', "/");
    let mut raw = raw.as_str();
    for prefix in ["/", "./", "assets/", "decks/"] {
        raw = raw.strip_prefix(prefix).unwrap_or(raw);
    }
    normalize_key(trim_card_extension(raw))
}

pub(crate) fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn trim_card_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if CARD_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) => stem,
        _ => name,
    }
}

fn has_card_extension(name: &str) -> bool {
    trim_card_extension(name).len() != name.len()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn catalog() -> AssetCatalog {
        AssetCatalog::from_files([
            ("Хобби", "Рыбалка.png"),
            ("Хобби", "Шахматы.jpg"),
            ("Бункер", "Склад.png"),
            ("Особые условия", "Будь другом.png"),
        ])
    }

    #[test]
    fn test_card_id_and_label_from_file_name() {
        let card = AssetCard::new("Хобби", "Рыбалка.PNG");
        assert_eq!(card.id, "decks/Хобби/Рыбалка.PNG");
        assert_eq!(card.label, "Рыбалка");
    }

    #[test]
    fn test_draw_removes_card_until_exhausted() {
        let mut pools = catalog().pools();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pools.draw("Хобби", &mut rng).is_some());
        assert!(pools.draw("Хобби", &mut rng).is_some());
        assert!(pools.draw("Хобби", &mut rng).is_none());
        assert!(pools.draw("Нет такой", &mut rng).is_none());
    }

    #[test]
    fn test_pools_do_not_share_state() {
        let catalog = catalog();
        let mut first = catalog.pools();
        let second = catalog.pools();
        let mut rng = StdRng::seed_from_u64(1);
        first.draw("Хобби", &mut rng);
        assert_eq!(first.remaining("Хобби"), 1);
        assert_eq!(second.remaining("Хобби"), 2);
        assert_eq!(catalog.deck("Хобби").len(), 2);
    }

    #[test]
    fn test_find_deck_by_keyword() {
        let catalog = catalog();
        assert_eq!(catalog.find_deck_by_keyword("бункер"), Some("Бункер"));
        assert_eq!(catalog.find_deck_by_keyword("угроз"), None);
    }

    #[test]
    fn test_normalize_asset_id_path() {
        assert_eq!(
            normalize_asset_id_path("\\assets\\decks\\X\\a.png").as_deref(),
            Some("decks/X/a.png")
        );
        assert_eq!(
            normalize_asset_id_path("Особые/a.png").as_deref(),
            Some("decks/Особые/a.png")
        );
        assert_eq!(normalize_asset_id_path("  "), None);
    }

    #[test]
    fn test_special_index_matches_title_and_stem() {
        let index = SpecialAssetIndex::build(&catalog().pools());
        assert_eq!(
            index.lookup(["Будь Другом"]),
            Some("decks/Особые условия/Будь другом.png")
        );
        assert_eq!(
            index.lookup(["missing", "будь_другом.webp"]),
            Some("decks/Особые условия/Будь другом.png")
        );
        assert_eq!(index.lookup(["Склад"]), None);
    }
}
