//! The built-in ability table, used when no declarative source is available.

use crate::ability::{
    CategoryParams, ChoiceKind, FinalThreatParams, ForceRevoteParams, GiveSpecialParams,
    Requirement, RoundRuleParams, SecretCondition, SecretConditionParams, SpecialDefinition,
    SpecialEffect, TargetScope, Trigger, VoteWeightParams,
};
use crate::CategoryKey;

struct Entry {
    id: &'static str,
    title: &'static str,
    text: &'static str,
    trigger: Trigger,
    effect: SpecialEffect,
    requires: &'static [&'static str],
    choice: ChoiceKind,
    scope: Option<TargetScope>,
}

impl Entry {
    fn into_definition(self) -> SpecialDefinition {
        SpecialDefinition {
            id: self.id.to_string(),
            title: self.title.to_string(),
            text: self.text.to_string(),
            trigger: self.trigger,
            effect: self.effect,
            implemented: true,
            requires: self.requires.iter().map(|r| Requirement::parse(r)).collect(),
            choice_kind: self.choice,
            target_scope: self.scope,
            allow_self: false,
            asset_id: None,
        }
    }
}

fn category(key: CategoryKey) -> CategoryParams {
    CategoryParams {
        category: Some(key),
    }
}

fn redeal(id: &'static str, title: &'static str, text: &'static str, key: CategoryKey) -> Entry {
    Entry {
        id,
        title,
        text,
        trigger: Trigger::Active,
        effect: SpecialEffect::RedealAllRevealed(category(key)),
        requires: &["phase=any"],
        choice: ChoiceKind::None,
        scope: None,
    }
}

fn swap(id: &'static str, title: &'static str, text: &'static str, key: CategoryKey) -> Entry {
    Entry {
        id,
        title,
        text,
        trigger: Trigger::Active,
        effect: SpecialEffect::SwapRevealedWithNeighbor(category(key)),
        requires: &["targetHasRevealedSameCategory", "needsNeighborIndexing"],
        choice: ChoiceKind::Neighbor,
        scope: Some(TargetScope::Neighbors),
    }
}

fn protect(
    id: &'static str,
    title: &'static str,
    text: &'static str,
    condition: SecretCondition,
    requires: &'static [&'static str],
) -> Entry {
    Entry {
        id,
        title,
        text,
        trigger: Trigger::SecretOnEliminate,
        effect: SpecialEffect::ForcedWastedVoteOnNextVoting(SecretConditionParams {
            condition: Some(condition),
        }),
        requires,
        choice: ChoiceKind::None,
        scope: None,
    }
}

fn targeted(
    id: &'static str,
    title: &'static str,
    text: &'static str,
    effect: SpecialEffect,
    requires: &'static [&'static str],
) -> Entry {
    Entry {
        id,
        title,
        text,
        trigger: Trigger::Active,
        effect,
        requires,
        choice: ChoiceKind::Player,
        scope: Some(TargetScope::AnyAlive),
    }
}

/// Returns a fresh copy of the 27 built-in abilities, in catalog order.
pub fn builtin_definitions() -> Vec<SpecialDefinition> {
    use CategoryKey::{Baggage, Biology, Facts, Health, Hobby, Profession};

    let entries = vec![
        targeted(
            "ban_vote_against",
            "Будь Другом",
            "Выбранный игрок до конца игры не голосует против тебя.",
            SpecialEffect::BanVoteAgainst,
            &["phase=voting"],
        ),
        Entry {
            id: "vote_weight",
            title: "Громкий Голос",
            text: "Твой голос считается за два в этом голосовании.",
            trigger: Trigger::OnVote,
            effect: SpecialEffect::VoteWeight(VoteWeightParams { weight: 2 }),
            requires: &["phase=voting"],
            choice: ChoiceKind::None,
            scope: None,
        },
        redeal(
            "redeal_baggage",
            "Давайте На Чистоту Багажа",
            "Перераздать все раскрытые карты багажа между живыми игроками.",
            Baggage,
        ),
        redeal(
            "redeal_biology",
            "Давайте На Чистоту Биология",
            "Перераздать все раскрытые карты биологии между живыми игроками.",
            Biology,
        ),
        redeal(
            "redeal_health",
            "Давайте На Чистоту Здоровья",
            "Перераздать все раскрытые карты здоровья между живыми игроками.",
            Health,
        ),
        redeal(
            "redeal_facts",
            "Давайте На Чистоту Фактов",
            "Перераздать раскрытые факты между живыми игроками.",
            Facts,
        ),
        redeal(
            "redeal_hobby",
            "Давайте На Чистоту Хобби",
            "Перераздать раскрытые карты хобби между живыми игроками.",
            Hobby,
        ),
        targeted(
            "disable_vote",
            "Дискредитация",
            "Лиши выбранного игрока голоса в текущем голосовании.",
            SpecialEffect::DisableVote,
            &["phase=voting"],
        ),
        protect(
            "protect_left",
            "Защити Игрока Слева",
            "Если левый сосед исключён, твой следующий голос тратится.",
            SecretCondition::LeftNeighborEliminated,
            &["needsNeighborIndexing"],
        ),
        protect(
            "protect_right",
            "Защити Игрока Справа",
            "Если правый сосед исключён, твой следующий голос тратится.",
            SecretCondition::RightNeighborEliminated,
            &["needsNeighborIndexing"],
        ),
        protect(
            "protect_youngest",
            "Защити Младшего",
            "Если исключён самый младший по раскрытому возрасту, твой следующий голос тратится.",
            SecretCondition::YoungestByRevealedAgeEliminated,
            &["ageFieldAvailable", "someRevealedAges"],
        ),
        protect(
            "protect_brave",
            "Защити Смелого",
            "Если исключён первый раскрывший здоровье, твой следующий голос тратится.",
            SecretCondition::FirstRevealedHealthEliminated,
            &["trackFirstRevealHealth"],
        ),
        protect(
            "protect_oldest",
            "Защити Старшего",
            "Если исключён самый старший по раскрытому возрасту, твой следующий голос тратится.",
            SecretCondition::OldestByRevealedAgeEliminated,
            &["ageFieldAvailable", "someRevealedAges"],
        ),
        targeted(
            "compromat",
            "Компромат",
            "Голоса против выбранного игрока считаются двойными, твой голос тратится.",
            SpecialEffect::DoubleVotesAgainstAndDisableSelfVote,
            &["phase=voting"],
        ),
        targeted(
            "need_more",
            "Мне Нужнее",
            "Забери багаж у выбранного игрока и выдай ему новое спецусловие.",
            SpecialEffect::StealBaggageAndGiveSpecial(GiveSpecialParams {
                give_special_count: 1,
            }),
            &["targetHasBaggage"],
        ),
        Entry {
            id: "silence",
            title: "Молчание",
            text: "До голосования нельзя говорить.",
            trigger: Trigger::OnRevealOrActive,
            effect: SpecialEffect::SetRoundRule(RoundRuleParams {
                no_talk_until_voting: Some(true),
            }),
            requires: &["phase=reveal"],
            choice: ChoiceKind::None,
            scope: None,
        },
        swap(
            "swap_baggage",
            "Обмен Карт Багаж",
            "Поменяйся раскрытой картой багажа с соседом.",
            Baggage,
        ),
        swap(
            "swap_biology",
            "Обмен Карт Биология",
            "Поменяйся раскрытой картой биологии с соседом.",
            Biology,
        ),
        swap(
            "swap_health",
            "Обмен Карт Здоровье",
            "Поменяйся раскрытой картой здоровья с соседом.",
            Health,
        ),
        swap(
            "swap_facts",
            "Обмен Карт Фактов",
            "Поменяйся раскрытой картой факта с соседом.",
            Facts,
        ),
        swap(
            "swap_hobby",
            "Обмен Карт Хобби",
            "Поменяйся раскрытой картой хобби с соседом.",
            Hobby,
        ),
        Entry {
            id: "plan_b",
            title: "План Б",
            text: "Запускает переголосование. Лидеров предыдущего голоса нельзя выбрать.",
            trigger: Trigger::Active,
            effect: SpecialEffect::ForceRevote(ForceRevoteParams {
                disallow_previous_candidate: true,
            }),
            requires: &["phase=voting", "votingStarted"],
            choice: ChoiceKind::None,
            scope: None,
        },
        targeted(
            "replace_health",
            "Просроченные Таблетки",
            "Замени раскрытую карту здоровья у выбранного игрока.",
            SpecialEffect::ReplaceRevealedCard(category(Health)),
            &["targetHasRevealedHealth"],
        ),
        Entry {
            id: "force_category",
            title: "Прямой Вопрос",
            text: "Выбери категорию, которую все обязаны раскрыть в этом раунде.",
            trigger: Trigger::Active,
            effect: SpecialEffect::ForceRevealCategoryForAll(CategoryParams::default()),
            requires: &["phase=reveal"],
            choice: ChoiceKind::Category,
            scope: None,
        },
        Entry {
            id: "final_threat",
            title: "Тайная Угроза",
            text: "При исключении владельца добавляет финальную угрозу.",
            trigger: Trigger::OnOwnerEliminated,
            effect: SpecialEffect::AddFinalThreat(FinalThreatParams {
                threat_key: Some("raiders_know_bunker".to_string()),
            }),
            requires: &["ownerEliminated"],
            choice: ChoiceKind::None,
            scope: None,
        },
        targeted(
            "replace_profession",
            "Фейковый Диплом",
            "Замени раскрытую карту профессии у выбранного игрока.",
            SpecialEffect::ReplaceRevealedCard(category(Profession)),
            &["targetHasRevealedProfession"],
        ),
        targeted(
            "discard_health",
            "Хорошие Таблетки",
            "Сбрасывает раскрытую карту здоровья и выдаёт новую скрытую.",
            SpecialEffect::DiscardRevealedAndDealHidden(category(Health)),
            &["targetHasRevealedHealth"],
        ),
    ];

    entries.into_iter().map(Entry::into_definition).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_builtin_table_has_27_unique_implemented_entries() {
        let defs = builtin_definitions();
        assert_eq!(defs.len(), 27);
        let ids: BTreeSet<_> = defs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), 27);
        assert!(defs.iter().all(|d| d.implemented));
        assert!(defs.iter().all(|d| !matches!(d.effect, SpecialEffect::Unsupported(_))));
    }

    #[test]
    fn test_builtin_swap_targets_neighbors() {
        let defs = builtin_definitions();
        let swap = defs.iter().find(|d| d.id == "swap_health").unwrap();
        assert_eq!(swap.choice_kind, ChoiceKind::Neighbor);
        assert_eq!(swap.target_scope, Some(TargetScope::Neighbors));
        assert_eq!(swap.effect.category(), Some(CategoryKey::Health));
        assert_eq!(
            swap.requires,
            vec![
                Requirement::TargetHasRevealedSameCategory,
                Requirement::NeedsNeighborIndexing
            ]
        );
    }

    #[test]
    fn test_builtin_force_category_has_no_default_category() {
        let defs = builtin_definitions();
        let force = defs.iter().find(|d| d.id == "force_category").unwrap();
        assert_eq!(force.choice_kind, ChoiceKind::Category);
        assert_eq!(force.effect.category(), None);
    }
}
