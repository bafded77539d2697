//! Typed ability definitions.
//!
//! The declarative source describes an ability's effect as a type string
//! plus a free-form parameter object. Here each effect kind is a variant
//! of [`SpecialEffect`] carrying its own parameter struct, so the engine
//! matches on variants and reads typed fields instead of probing a map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CategoryKey;

// ---------------------------------------------------------------------------
// SpecialDefinition
// ---------------------------------------------------------------------------

/// One ability as declared in the catalog.
///
/// Sessions snapshot the definition into every instance they deal, so a
/// definition is never mutated after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialDefinition {
    pub id: String,
    pub title: String,
    pub text: String,
    pub trigger: Trigger,
    pub effect: SpecialEffect,
    pub implemented: bool,
    pub requires: Vec<Requirement>,
    pub choice_kind: ChoiceKind,
    pub target_scope: Option<TargetScope>,
    /// Whether a player-choice ability may target its owner.
    pub allow_self: bool,
    /// Declared card image, already normalised to `decks/...`.
    pub asset_id: Option<String>,
}

impl SpecialDefinition {
    /// Names under which the ability's card image may be indexed.
    ///
    /// Covers the declared asset path, the title and the id, plus the leaf
    /// file name and stem of any value that looks like a path.
    pub fn asset_candidates(&self) -> Vec<String> {
        let mut out = Vec::new();
        let values = [
            self.asset_id.as_deref().unwrap_or_default(),
            self.title.as_str(),
            self.id.as_str(),
        ];
        for value in values {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            out.push(value.to_string());
            let slashed = value.replace('\\', "/");
            if slashed.contains('/') {
                let leaf = crate::assets::leaf_name(&slashed);
                out.push(leaf.to_string());
                out.push(crate::assets::trim_card_extension(leaf).to_string());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Trigger / ChoiceKind / TargetScope
// ---------------------------------------------------------------------------

/// When an ability fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "onVote")]
    OnVote,
    #[serde(rename = "onRevealOrActive")]
    OnRevealOrActive,
    #[serde(rename = "onOwnerEliminated")]
    OnOwnerEliminated,
    #[serde(rename = "secret_onEliminate")]
    SecretOnEliminate,
}

impl Trigger {
    /// Parses a declared trigger; blank or unknown values mean `active`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "onVote" => Self::OnVote,
            "onRevealOrActive" => Self::OnRevealOrActive,
            "onOwnerEliminated" => Self::OnOwnerEliminated,
            "secret_onEliminate" => Self::SecretOnEliminate,
            _ => Self::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnVote => "onVote",
            Self::OnRevealOrActive => "onRevealOrActive",
            Self::OnOwnerEliminated => "onOwnerEliminated",
            Self::SecretOnEliminate => "secret_onEliminate",
        }
    }

    /// Automatic abilities fire from the elimination routine and can never
    /// be activated by hand.
    pub fn is_automatic(self) -> bool {
        matches!(self, Self::OnOwnerEliminated | Self::SecretOnEliminate)
    }
}

/// What a client must pick before activating an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceKind {
    #[default]
    None,
    Player,
    Neighbor,
    Category,
}

impl ChoiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Player => "player",
            Self::Neighbor => "neighbor",
            Self::Category => "category",
        }
    }
}

/// Which players an ability may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    #[serde(rename = "self")]
    SelfOnly,
    Neighbors,
    AnyAlive,
    AnyIncludingSelf,
}

impl TargetScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfOnly => "self",
            Self::Neighbors => "neighbors",
            Self::AnyAlive => "any_alive",
            Self::AnyIncludingSelf => "any_including_self",
        }
    }

    pub fn allows_self(self) -> bool {
        matches!(self, Self::SelfOnly | Self::AnyIncludingSelf)
    }
}

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

/// A precondition checked before an active ability's effect runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    PhaseVoting,
    PhaseReveal,
    PhaseAny,
    VotingStarted,
    TargetHasBaggage,
    TargetHasRevealedHealth,
    TargetHasRevealedProfession,
    TargetHasRevealedSameCategory,
    NeedsNeighborIndexing,
    AgeFieldAvailable,
    SomeRevealedAges,
    TrackFirstRevealHealth,
    OwnerEliminated,
    /// Kept for display; never blocks activation.
    Unknown(String),
}

impl Requirement {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "phase=voting" => Self::PhaseVoting,
            "phase=reveal" => Self::PhaseReveal,
            "phase=any" => Self::PhaseAny,
            "votingStarted" => Self::VotingStarted,
            "targetHasBaggage" => Self::TargetHasBaggage,
            "targetHasRevealedHealth" => Self::TargetHasRevealedHealth,
            "targetHasRevealedProfession" => Self::TargetHasRevealedProfession,
            "targetHasRevealedSameCategory" => Self::TargetHasRevealedSameCategory,
            "needsNeighborIndexing" => Self::NeedsNeighborIndexing,
            "ageFieldAvailable" => Self::AgeFieldAvailable,
            "someRevealedAges" => Self::SomeRevealedAges,
            "trackFirstRevealHealth" => Self::TrackFirstRevealHealth,
            "ownerEliminated" => Self::OwnerEliminated,
            other => Self::Unknown(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// SpecialEffect
// ---------------------------------------------------------------------------

/// Parameters for effects that act on one card category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteWeightParams {
    #[serde(default = "default_vote_weight")]
    pub weight: i64,
}

impl Default for VoteWeightParams {
    fn default() -> Self {
        Self {
            weight: default_vote_weight(),
        }
    }
}

fn default_vote_weight() -> i64 {
    2
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceRevoteParams {
    #[serde(default)]
    pub disallow_previous_candidate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRuleParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_talk_until_voting: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveSpecialParams {
    #[serde(default = "default_give_count")]
    pub give_special_count: i64,
}

impl Default for GiveSpecialParams {
    fn default() -> Self {
        Self {
            give_special_count: default_give_count(),
        }
    }
}

fn default_give_count() -> i64 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalThreatParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_key: Option<String>,
}

/// Elimination pattern a secret ability watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretCondition {
    LeftNeighborEliminated,
    RightNeighborEliminated,
    YoungestByRevealedAgeEliminated,
    OldestByRevealedAgeEliminated,
    FirstRevealedHealthEliminated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretConditionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<SecretCondition>,
}

/// An ability's effect with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialEffect {
    BanVoteAgainst,
    VoteWeight(VoteWeightParams),
    DisableVote,
    DoubleVotesAgainstAndDisableSelfVote,
    ForceRevote(ForceRevoteParams),
    SwapRevealedWithNeighbor(CategoryParams),
    ReplaceRevealedCard(CategoryParams),
    DiscardRevealedAndDealHidden(CategoryParams),
    RedealAllRevealed(CategoryParams),
    ForceRevealCategoryForAll(CategoryParams),
    SetRoundRule(RoundRuleParams),
    StealBaggageAndGiveSpecial(GiveSpecialParams),
    AddFinalThreat(FinalThreatParams),
    ForcedWastedVoteOnNextVoting(SecretConditionParams),
    None,
    /// An effect kind this engine does not know; activation fails.
    Unsupported(String),
}

impl SpecialEffect {
    /// Builds an effect from its declared type and parameter object.
    ///
    /// Parameters that do not fit the kind's struct are replaced by the
    /// kind's defaults with a warning, so one bad entry never sinks a
    /// whole catalog.
    pub fn from_parts(kind: &str, params: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned + Default>(kind: &str, params: Value) -> T {
            let params = if params.is_null() {
                Value::Object(Default::default())
            } else {
                params
            };
            serde_json::from_value(params).unwrap_or_else(|err| {
                tracing::warn!(effect = kind, error = %err, "ignoring malformed ability params");
                T::default()
            })
        }

        match kind.trim() {
            "banVoteAgainst" => Self::BanVoteAgainst,
            "voteWeight" => Self::VoteWeight(typed(kind, params)),
            "disableVote" => Self::DisableVote,
            "doubleVotesAgainst_and_disableSelfVote" => Self::DoubleVotesAgainstAndDisableSelfVote,
            "forceRevote" => Self::ForceRevote(typed(kind, params)),
            "swapRevealedWithNeighbor" => Self::SwapRevealedWithNeighbor(typed(kind, params)),
            "replaceRevealedCard" => Self::ReplaceRevealedCard(typed(kind, params)),
            "discardRevealedAndDealHidden" => Self::DiscardRevealedAndDealHidden(typed(kind, params)),
            "redealAllRevealed" => Self::RedealAllRevealed(typed(kind, params)),
            "forceRevealCategoryForAll" => Self::ForceRevealCategoryForAll(typed(kind, params)),
            "setRoundRule" => Self::SetRoundRule(typed(kind, params)),
            "stealBaggage_and_giveSpecial" => Self::StealBaggageAndGiveSpecial(typed(kind, params)),
            "addFinalThreat" => Self::AddFinalThreat(typed(kind, params)),
            "forcedWastedVoteOnNextVoting" => Self::ForcedWastedVoteOnNextVoting(typed(kind, params)),
            "" | "none" => Self::None,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// The declared type string.
    pub fn kind(&self) -> &str {
        match self {
            Self::BanVoteAgainst => "banVoteAgainst",
            Self::VoteWeight(_) => "voteWeight",
            Self::DisableVote => "disableVote",
            Self::DoubleVotesAgainstAndDisableSelfVote => "doubleVotesAgainst_and_disableSelfVote",
            Self::ForceRevote(_) => "forceRevote",
            Self::SwapRevealedWithNeighbor(_) => "swapRevealedWithNeighbor",
            Self::ReplaceRevealedCard(_) => "replaceRevealedCard",
            Self::DiscardRevealedAndDealHidden(_) => "discardRevealedAndDealHidden",
            Self::RedealAllRevealed(_) => "redealAllRevealed",
            Self::ForceRevealCategoryForAll(_) => "forceRevealCategoryForAll",
            Self::SetRoundRule(_) => "setRoundRule",
            Self::StealBaggageAndGiveSpecial(_) => "stealBaggage_and_giveSpecial",
            Self::AddFinalThreat(_) => "addFinalThreat",
            Self::ForcedWastedVoteOnNextVoting(_) => "forcedWastedVoteOnNextVoting",
            Self::None => "none",
            Self::Unsupported(kind) => kind,
        }
    }

    /// The parameter object as it would appear in the declarative source.
    pub fn params_json(&self) -> Value {
        let value = match self {
            Self::VoteWeight(p) => serde_json::to_value(p),
            Self::ForceRevote(p) => serde_json::to_value(p),
            Self::SwapRevealedWithNeighbor(p)
            | Self::ReplaceRevealedCard(p)
            | Self::DiscardRevealedAndDealHidden(p)
            | Self::RedealAllRevealed(p)
            | Self::ForceRevealCategoryForAll(p) => serde_json::to_value(p),
            Self::SetRoundRule(p) => serde_json::to_value(p),
            Self::StealBaggageAndGiveSpecial(p) => serde_json::to_value(p),
            Self::AddFinalThreat(p) => serde_json::to_value(p),
            Self::ForcedWastedVoteOnNextVoting(p) => serde_json::to_value(p),
            _ => Ok(Value::Object(Default::default())),
        };
        value.unwrap_or_default()
    }

    /// The category parameter of category-based effects.
    pub fn category(&self) -> Option<CategoryKey> {
        match self {
            Self::SwapRevealedWithNeighbor(p)
            | Self::ReplaceRevealedCard(p)
            | Self::DiscardRevealedAndDealHidden(p)
            | Self::RedealAllRevealed(p)
            | Self::ForceRevealCategoryForAll(p) => p.category,
            _ => None,
        }
    }

    /// Effects that only act on the vote currently being collected.
    pub fn is_voting_window_only(&self) -> bool {
        matches!(
            self,
            Self::BanVoteAgainst
                | Self::DisableVote
                | Self::VoteWeight(_)
                | Self::ForceRevote(_)
                | Self::DoubleVotesAgainstAndDisableSelfVote
        )
    }
}
