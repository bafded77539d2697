//! Loading ability definitions from a declarative JSON source.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::ability::{ChoiceKind, Requirement, SpecialDefinition, SpecialEffect, TargetScope, Trigger};
use crate::assets::normalize_asset_id_path;
use crate::{CatalogError, builtin_definitions};

/// One entry as written in the declarative source.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefinition {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    trigger: String,
    #[serde(default)]
    implemented: bool,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    ui_targeting: String,
    #[serde(default)]
    effect: RawEffect,
}

#[derive(Debug, Default, Deserialize)]
struct RawEffect {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    params: Value,
}

impl RawDefinition {
    fn into_definition(self) -> Option<SpecialDefinition> {
        if !self.implemented {
            return None;
        }
        let file = self.file.trim().replace('\\', "/");
        let file = file.trim_start_matches('/');
        let title = self.title.trim();

        let id = [self.id.trim(), file, title]
            .into_iter()
            .find(|candidate| !candidate.is_empty())?
            .to_string();

        let choice_kind = infer_choice_kind(&self.ui_targeting);
        let target_scope = infer_target_scope(&self.ui_targeting, choice_kind);

        Some(SpecialDefinition {
            title: if title.is_empty() { id.clone() } else { title.to_string() },
            text: self.text.trim().to_string(),
            trigger: Trigger::parse(&self.trigger),
            effect: SpecialEffect::from_parts(&self.effect.kind, self.effect.params),
            implemented: true,
            requires: self.requires.iter().map(|r| Requirement::parse(r)).collect(),
            choice_kind,
            target_scope,
            allow_self: target_scope.is_some_and(TargetScope::allows_self),
            asset_id: normalize_asset_id_path(file),
            id,
        })
    }
}

// ---------------------------------------------------------------------------
// AbilityCatalog
// ---------------------------------------------------------------------------

/// The process-wide ability table.
///
/// Cloning is cheap (the definitions sit behind an `Arc`). Sessions call
/// [`working_copy`](Self::working_copy) to get an owned pool they can draw
/// from without touching the shared table.
#[derive(Debug, Clone)]
pub struct AbilityCatalog {
    definitions: Arc<[SpecialDefinition]>,
}

impl AbilityCatalog {
    pub fn new(definitions: Vec<SpecialDefinition>) -> Self {
        Self {
            definitions: definitions.into(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_definitions())
    }

    /// Parses a JSON array of declared abilities, keeping implemented ones.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawDefinition> = serde_json::from_str(json)?;
        let definitions: Vec<_> = raw
            .into_iter()
            .filter_map(RawDefinition::into_definition)
            .collect();
        if definitions.is_empty() {
            return Err(CatalogError::NoImplementedDefinitions);
        }
        Ok(Self::new(definitions))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Loads `path` if given, falling back to the built-in table on any error.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::info!("no ability file configured, using built-in abilities");
            return Self::builtin();
        };
        match Self::from_file(path) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), count = catalog.len(), "ability catalog loaded");
                catalog
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "falling back to built-in abilities");
                Self::builtin()
            }
        }
    }

    pub fn definitions(&self) -> &[SpecialDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// An owned copy of every definition for one session's draw pool.
    pub fn working_copy(&self) -> Vec<SpecialDefinition> {
        self.definitions.to_vec()
    }

    pub fn find(&self, id: &str) -> Option<&SpecialDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// The first definition whose effect kind is `kind`.
    pub fn find_by_effect_kind(&self, kind: &str) -> Option<&SpecialDefinition> {
        self.definitions.iter().find(|d| d.effect.kind() == kind)
    }
}

impl Default for AbilityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Targeting inference
// ---------------------------------------------------------------------------

const NEIGHBOR_WORDS: [&str; 6] = ["neighbor", "сосед", "left", "right", "слева", "справа"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Infers what a client must choose from a free-text targeting hint.
pub fn infer_choice_kind(ui_targeting: &str) -> ChoiceKind {
    let targeting = ui_targeting.trim().to_lowercase();
    if targeting.is_empty() {
        ChoiceKind::None
    } else if contains_any(&targeting, &NEIGHBOR_WORDS) {
        ChoiceKind::Neighbor
    } else if contains_any(&targeting, &["category", "категор"]) {
        ChoiceKind::Category
    } else if contains_any(&targeting, &["player", "игрок", "target", "цель"]) {
        ChoiceKind::Player
    } else {
        ChoiceKind::None
    }
}

/// Infers the target scope; category and no-choice abilities have none.
pub fn infer_target_scope(ui_targeting: &str, choice: ChoiceKind) -> Option<TargetScope> {
    if matches!(choice, ChoiceKind::None | ChoiceKind::Category) {
        return None;
    }
    let targeting = ui_targeting.trim().to_lowercase();
    let scope = if contains_any(&targeting, &NEIGHBOR_WORDS) {
        TargetScope::Neighbors
    } else if contains_any(&targeting, &["including self", "включая себя", "any_including_self"]) {
        TargetScope::AnyIncludingSelf
    } else if contains_any(&targeting, &["self", "себя", "сам"]) {
        TargetScope::SelfOnly
    } else {
        TargetScope::AnyAlive
    };
    Some(scope)
}
