//! Read-mostly game content for the bunker engine.
//!
//! Two catalogs are loaded once per process and shared by every room:
//!
//! - [`AssetCatalog`]: card decks discovered on disk (or built in memory),
//!   handed to each session as a private [`DeckPools`] working copy.
//! - [`AbilityCatalog`]: special-ability definitions, loaded from a JSON
//!   file with a fallback to the built-in table, cloned per session so
//!   drawing from the pool never leaks across games.
//!
//! [`CategoryKey`] ties card categories (as players and abilities name
//! them) to the decks and fact slots cards are dealt from.

mod ability;
mod assets;
mod builtin;
mod category;
mod error;
mod loader;

pub use ability::{
    CategoryParams, ChoiceKind, FinalThreatParams, ForceRevoteParams, GiveSpecialParams,
    Requirement, RoundRuleParams, SecretCondition, SecretConditionParams, SpecialDefinition,
    SpecialEffect, TargetScope, Trigger, VoteWeightParams,
};
pub use assets::{
    AssetCard, AssetCatalog, DeckPools, SpecialAssetIndex, normalize_asset_id_path,
    normalize_deck_key,
};
pub use builtin::builtin_definitions;
pub use category::{
    BIOLOGY_DECK, CATEGORY_ORDER, CORE_DECKS, CategoryKey, FACTS_DECK, FactSlot, HEALTH_DECK,
    SPECIAL_CATEGORY_LABEL, normalize_key,
};
pub use error::CatalogError;
pub use loader::{AbilityCatalog, infer_choice_kind, infer_target_scope};
