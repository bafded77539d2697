//! Per-viewer projections: what each player may see of the table.

mod common;

use std::collections::BTreeMap;

use bunker_engine::{
    DevTestSession, GameEngine, NoPresence, PlayerPresence, Scenario, SlotStatus, VotePhase,
};
use common::{GameBuilder, pid, play_until_vote, reveal_current, ruleset, vote};

#[test]
fn test_hidden_cards_stay_private() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    reveal_current(&mut session);

    let view = session.build_game_view(&NoPresence, &pid("p2"));
    assert_eq!(view.you.player_id, pid("p2"));
    assert_eq!(view.you.hand.len(), 7);
    assert!(view.you.hand.iter().all(|c| !c.revealed));

    let p1 = &view.public.players[0];
    assert_eq!(p1.revealed_count, 1);
    assert_eq!(p1.total_cards, 7);
    assert_eq!(p1.revealed_cards.len(), 1);
    assert!(!p1.special_revealed);

    let profession = &p1.categories[0];
    assert_eq!(profession.category, "Профессия");
    assert_eq!(profession.status, SlotStatus::Revealed);
    assert_eq!(profession.cards.len(), 1);
    for slot in &p1.categories[1..] {
        assert_eq!(slot.status, SlotStatus::Hidden);
        assert!(slot.cards.is_empty());
    }
    assert_eq!(p1.categories.last().unwrap().category, "Особые условия");
}

#[test]
fn test_world_is_masked_until_revealed() {
    let (session, _clock) = GameBuilder::new(4).build();
    let view = session.build_game_view(&NoPresence, &pid("p1"));

    assert!(!view.world.bunker[0].card.title.is_empty());
    assert!(view.world.bunker[1..].iter().all(|c| c.card.title.is_empty() && c.card.image_id.is_none()));
    assert!(view.world.threats.iter().all(|c| c.card.title.is_empty()));
    assert!(!view.world.disaster.title.is_empty());
    assert!(!session.world().threats[0].card.title.is_empty());
}

#[test]
fn test_view_serializes_in_camel_case() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    reveal_current(&mut session);
    let view = session.build_game_view(&NoPresence, &pid("p1"));
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["phase"], "reveal_discussion");
    assert_eq!(json["categoryOrder"].as_array().unwrap().len(), 8);
    assert_eq!(json["categoryOrder"][7], "Особые условия");
    assert_eq!(json["public"]["currentTurnPlayerId"], "p1");
    assert_eq!(json["public"]["votesRemainingInRound"], 0);
    assert_eq!(json["public"]["roundRevealedCount"], 1);
    assert!(json["you"]["hand"][0]["labelShort"].is_string());
    assert!(json["public"].get("votingProgress").is_none());

    let image = json["public"]["players"][0]["categories"][0]["cards"][0]["imgUrl"]
        .as_str()
        .unwrap();
    assert!(image.starts_with("/assets/decks/Профессия/"));
}

#[test]
fn test_voting_progress_and_ballots() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();
    play_until_vote(&mut session);
    vote(&mut session, "p1", "p2");
    vote(&mut session, "p2", "p3");

    let view = session.build_game_view(&NoPresence, &pid("p1"));
    let progress = view.public.voting_progress.unwrap();
    assert_eq!((progress.voted, progress.total), (2, 4));
    assert!(view.public.voting.unwrap().has_voted);
    assert_eq!(view.public.vote_phase, Some(VotePhase::Voting));
    assert!(view.public.vote_modal_open);
    assert_eq!(view.public.votes_public.len(), 4);
    assert_eq!(view.public.votes_public[0].target_name.as_deref(), Some("Player 2"));

    let other = session.build_game_view(&NoPresence, &pid("p3"));
    assert!(!other.public.voting.unwrap().has_voted);
}

#[test]
fn test_presence_comes_from_the_room() {
    let (session, _clock) = GameBuilder::new(4).build();
    let mut room = BTreeMap::new();
    room.insert(
        pid("p2"),
        PlayerPresence {
            connected: true,
            disconnected_at: None,
        },
    );
    room.insert(
        pid("p3"),
        PlayerPresence {
            connected: false,
            disconnected_at: Some(42),
        },
    );

    let view = session.build_game_view(&room, &pid("p1"));
    assert!(!view.public.players[0].connected);
    assert!(view.public.players[1].connected);
    assert_eq!(view.public.players[2].disconnected_at, Some(42));
}

#[test]
fn test_unknown_viewer_gets_an_empty_hand() {
    let (session, _clock) = GameBuilder::new(4).build();
    let view = session.build_game_view(&NoPresence, &pid("spectator"));
    assert_eq!(view.you.name, "Unknown");
    assert!(view.you.hand.is_empty());
    assert_eq!(view.public.players.len(), 4);
}

#[test]
fn test_building_a_view_is_idempotent() {
    let (session, _clock) = GameBuilder::new(4).build();
    let first = session.build_game_view(&NoPresence, &pid("p1"));
    let second = session.build_game_view(&NoPresence, &pid("p1"));
    assert_eq!(first, second);
}

#[test]
fn test_sandbox_shows_every_card() {
    let (core, _clock) = GameBuilder::new(4).scenario(Scenario::DevTest).build();
    let session = DevTestSession::new(core);
    let view = session.build_game_view(&NoPresence, &pid("p1"));

    let p2 = &view.public.players[1];
    assert!(p2.special_revealed);
    assert_eq!(p2.revealed_count, 0);
    for slot in &p2.categories[..7] {
        assert_eq!(slot.cards.len(), 1);
        assert!(slot.cards.iter().all(|c| !c.revealed));
    }
    assert_eq!(p2.categories[7].cards.len(), 2);
}
