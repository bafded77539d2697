//! Turn flow, rounds, timers, game end and the post-game of the classic
//! session.

mod common;

use bunker_engine::{
    ContinuePermission, GameEngine, GameErrorKind, GameSettings, Phase, PlayerStatus, RevealTimeoutAction,
    TimerKind, VotePhase,
};
use bunker_protocol::{BunkerOutcome, EventKind, GameAction, PlayerId};
use common::{
    GameBuilder, START_MS, assert_unique_instance_ids, first_hidden, pid, play_until_vote, reveal_current,
    ruleset, vote,
};

// ============================================================================
// Dealing
// ============================================================================

#[test]
fn test_new_game_deals_every_player() {
    let (session, _clock) = GameBuilder::new(4).build();

    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.round(), 1);
    assert_eq!(session.current_turn(), Some(&pid("p1")));
    assert_eq!(session.last_stage_text(), "Round 1. Card reveal.");

    for player in session.players() {
        assert_eq!(player.hand.len(), 7, "five core decks plus two facts");
        assert!(player.hand.iter().all(|c| !c.revealed && !c.missing));
        assert_eq!(player.hand.iter().filter(|c| c.deck == "Факты").count(), 2);
        assert_eq!(player.specials.len(), 1);
        assert!(!player.specials[0].revealed_public);
        for card in &player.hand {
            assert!(card.instance_id.starts_with(&format!("{}-", player.id)));
        }
    }
    assert_unique_instance_ids(&session);
}

#[test]
fn test_world_is_rolled_for_the_roster() {
    let (session, _clock) = GameBuilder::new(4).build();
    let world = session.world();

    assert_eq!(world.bunker.len(), 5);
    assert_eq!(world.counts.threats, 3);
    assert_eq!(world.threats.len(), 4, "one spare threat beyond the table count");
    assert!(world.bunker[0].is_revealed);
    assert!(world.bunker[1..].iter().all(|c| !c.is_revealed));
}

#[test]
fn test_auto_ruleset_follows_roster_size() {
    let (session, _clock) = GameBuilder::new(4).build();
    assert_eq!(session.ruleset().votes_per_round, vec![0, 0, 0, 1, 1]);
    assert_eq!(session.ruleset().bunker_seats, 2);
    assert_eq!(session.votes_remaining(), 0);
}

// ============================================================================
// Reveal turns
// ============================================================================

#[test]
fn test_reveal_out_of_turn_is_rejected() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let card = first_hidden(&session, "p2");

    let err = session
        .apply_action(&pid("p2"), GameAction::RevealCard { card_id: card })
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);
    assert_eq!(session.phase(), Phase::Reveal);
}

#[test]
fn test_reveal_opens_discussion_then_passes_turn() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let card = first_hidden(&session, "p1");

    let outcome = session
        .apply_action(&pid("p1"), GameAction::RevealCard { card_id: card.clone() })
        .unwrap();
    assert!(outcome.state_changed);
    assert_eq!(session.phase(), Phase::RevealDiscussion);
    assert!(session.has_revealed_this_round(&pid("p1")));

    let again = session
        .apply_action(&pid("p1"), GameAction::RevealCard { card_id: card })
        .unwrap_err();
    assert_eq!(again.kind(), GameErrorKind::PhaseMismatch);

    session.apply_action(&pid("p3"), GameAction::ContinueRound).unwrap();
    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.current_turn(), Some(&pid("p2")));
}

#[test]
fn test_unknown_card_is_not_found() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let err = session
        .apply_action(
            &pid("p1"),
            GameAction::RevealCard {
                card_id: "p2-8".into(),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::NotFound);
}

#[test]
fn test_revealer_only_continue() {
    let (mut session, _clock) = GameBuilder::new(4)
        .settings(GameSettings::default())
        .build();
    reveal_current(&mut session);

    let err = session.apply_action(&pid("p2"), GameAction::ContinueRound).unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);

    session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
    assert_eq!(session.current_turn(), Some(&pid("p2")));
}

#[test]
fn test_host_only_continue() {
    let settings = GameSettings {
        continue_permission: ContinuePermission::HostOnly,
        ..GameSettings::default()
    };
    let (mut session, _clock) = GameBuilder::new(4).settings(settings).build();
    reveal_current(&mut session);
    session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
    reveal_current(&mut session);

    let err = session.apply_action(&pid("p2"), GameAction::ContinueRound).unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);
    session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
}

#[test]
fn test_round_without_votes_moves_to_next_round() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    for _ in 0..3 {
        reveal_current(&mut session);
        session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
    }
    reveal_current(&mut session);
    let outcome = session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();

    assert!(outcome.events.iter().any(|e| e.kind == EventKind::RoundStart));
    assert_eq!(session.round(), 2);
    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.current_turn(), Some(&pid("p1")));
    assert!(!session.has_revealed_this_round(&pid("p1")));
    assert_eq!(session.world().bunker.iter().filter(|c| c.is_revealed).count(), 2);
}

// ============================================================================
// Timers
// ============================================================================

fn timed_settings(action: RevealTimeoutAction) -> GameSettings {
    GameSettings {
        enable_reveal_discussion_timer: true,
        reveal_discussion_seconds: 30,
        continue_permission: ContinuePermission::Anyone,
        reveal_timeout_action: action,
        ..GameSettings::default()
    }
}

#[test]
fn test_stale_and_early_expiries_are_ignored() {
    let (mut session, _clock) = GameBuilder::new(4)
        .settings(timed_settings(RevealTimeoutAction::RandomCard))
        .build();
    let turn_timer = session.current_timer().unwrap();
    assert_eq!(turn_timer.kind, TimerKind::RevealDiscussion);
    assert_eq!(turn_timer.ends_at, START_MS + 30_000);

    reveal_current(&mut session);
    let discussion = session.current_timer().unwrap();
    assert!(discussion.version > turn_timer.version);

    let stale = session.expire_timer(START_MS + 60_000, turn_timer.version).unwrap();
    assert!(!stale.state_changed);
    let early = session.expire_timer(START_MS + 1_000, discussion.version).unwrap();
    assert!(!early.state_changed);
    assert_eq!(session.phase(), Phase::RevealDiscussion);

    let fired = session.expire_timer(discussion.ends_at, discussion.version).unwrap();
    assert!(fired.state_changed);
    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.current_turn(), Some(&pid("p2")));
}

#[test]
fn test_reveal_timeout_reveals_random_card() {
    let (mut session, _clock) = GameBuilder::new(4)
        .settings(timed_settings(RevealTimeoutAction::RandomCard))
        .build();
    let timer = session.current_timer().unwrap();

    session.expire_timer(timer.ends_at, timer.version).unwrap();

    let p1 = session.player(&pid("p1")).unwrap();
    assert_eq!(p1.hand.iter().filter(|c| c.revealed).count(), 1);
    assert_eq!(session.phase(), Phase::RevealDiscussion);
    assert!(session.last_stage_text().contains("automatically"));
}

#[test]
fn test_reveal_timeout_can_skip_the_turn() {
    let (mut session, _clock) = GameBuilder::new(4)
        .settings(timed_settings(RevealTimeoutAction::SkipPlayer))
        .build();
    let timer = session.current_timer().unwrap();

    session.expire_timer(timer.ends_at, timer.version).unwrap();

    let p1 = session.player(&pid("p1")).unwrap();
    assert!(p1.hand.iter().all(|c| !c.revealed));
    assert!(session.has_revealed_this_round(&pid("p1")));
    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.current_turn(), Some(&pid("p2")));
    assert_eq!(session.last_stage_text(), "Timeout: Player 1's turn skipped.");
}

#[test]
fn test_no_timer_when_disabled() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    assert!(session.current_timer().is_none());
    reveal_current(&mut session);
    assert!(session.current_timer().is_none());
}

// ============================================================================
// Voting and resolution
// ============================================================================

#[test]
fn test_majority_vote_eliminates_and_auto_advances() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();
    play_until_vote(&mut session);
    assert_eq!(session.phase(), Phase::Voting);
    assert_eq!(session.vote_phase(), Some(VotePhase::Voting));

    vote(&mut session, "p1", "p3");
    vote(&mut session, "p2", "p3");
    vote(&mut session, "p3", "p1");
    vote(&mut session, "p4", "p3");
    assert_eq!(session.vote_phase(), Some(VotePhase::SpecialWindow));

    let err = session.apply_action(&pid("p2"), GameAction::FinalizeVoting).unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);

    let outcome = session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::Elimination));
    assert_eq!(session.phase(), Phase::Resolution);
    assert_eq!(session.vote_phase(), Some(VotePhase::Resolve));
    assert!(!session.player(&pid("p3")).unwrap().is_alive());
    assert_eq!(session.total_exiles(), 1);
    assert_eq!(session.votes_remaining(), 0);

    let timer = session.current_timer().unwrap();
    assert_eq!(timer.kind, TimerKind::ResolutionAuto);
    assert_eq!(timer.ends_at, START_MS + 2_000);
    session.expire_timer(timer.ends_at, timer.version).unwrap();
    assert_eq!(session.round(), 2);
    assert_eq!(session.phase(), Phase::Reveal);
}

#[test]
fn test_tie_triggers_single_revote() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();
    play_until_vote(&mut session);
    vote(&mut session, "p1", "p2");
    vote(&mut session, "p2", "p1");
    vote(&mut session, "p3", "p1");
    vote(&mut session, "p4", "p2");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();

    assert_eq!(session.phase(), Phase::Voting);
    assert_eq!(session.vote_phase(), Some(VotePhase::Voting));
    assert_eq!(session.last_stage_text(), "Tie. Revote between top candidates.");

    let err = session
        .apply_action(
            &pid("p3"),
            GameAction::Vote {
                target_player_id: pid("p4"),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::NotFound);

    vote(&mut session, "p1", "p2");
    vote(&mut session, "p2", "p1");
    vote(&mut session, "p3", "p2");
    vote(&mut session, "p4", "p2");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();

    assert_eq!(session.phase(), Phase::Resolution);
    assert!(!session.player(&pid("p2")).unwrap().is_alive());
}

/// Ties p1 and p2 in the vote and again in the revote; returns who went.
fn settle_persistent_tie(seed: u64) -> PlayerId {
    let (mut session, _clock) = GameBuilder::new(4)
        .ruleset(ruleset(4, &[1, 1], 2, 2))
        .seed(seed)
        .build();
    play_until_vote(&mut session);
    for _ in 0..2 {
        vote(&mut session, "p1", "p2");
        vote(&mut session, "p2", "p1");
        vote(&mut session, "p3", "p1");
        vote(&mut session, "p4", "p2");
        session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    }

    assert_eq!(session.phase(), Phase::Resolution);
    assert_eq!(session.vote_phase(), Some(VotePhase::Resolve));
    assert!(session.last_stage_text().starts_with("Voting result:"));
    assert!(session.player(&pid("p3")).unwrap().is_alive());
    assert!(session.player(&pid("p4")).unwrap().is_alive());
    let out: Vec<PlayerId> = ["p1", "p2"]
        .into_iter()
        .map(pid)
        .filter(|id| !session.player(id).unwrap().is_alive())
        .collect();
    assert_eq!(out.len(), 1);
    out[0].clone()
}

#[test]
fn test_tie_after_revote_eliminates_a_tied_candidate() {
    let first = settle_persistent_tie(7);
    assert_eq!(settle_persistent_tie(7), first);
    let other = settle_persistent_tie(11);
    assert!(other == pid("p1") || other == pid("p2"));
}

#[test]
fn test_auto_ruleset_votes_only_in_the_last_two_rounds() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    for round in 1..=3 {
        assert_eq!(session.round(), round);
        assert_eq!(session.votes_remaining(), 0);
        for _ in 0..4 {
            reveal_current(&mut session);
            let outcome = session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
            assert!(outcome.events.iter().all(|e| e.kind != EventKind::VotingStart));
        }
    }
    assert_eq!(session.round(), 4);
    assert_eq!(session.votes_remaining(), 1);

    play_until_vote(&mut session);
    assert_eq!(session.phase(), Phase::Voting);
    vote(&mut session, "p1", "p2");
    vote(&mut session, "p2", "p1");
    vote(&mut session, "p3", "p1");
    vote(&mut session, "p4", "p2");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    assert_eq!(session.vote_phase(), Some(VotePhase::Voting));

    let err = session
        .apply_action(
            &pid("p1"),
            GameAction::Vote {
                target_player_id: pid("p3"),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::NotFound);
    vote(&mut session, "p1", "p2");
    vote(&mut session, "p2", "p1");
    vote(&mut session, "p3", "p2");
    vote(&mut session, "p4", "p2");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    assert!(!session.player(&pid("p2")).unwrap().is_alive());

    session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
    assert_eq!(session.round(), 5);
    play_until_vote(&mut session);
    vote(&mut session, "p1", "p3");
    vote(&mut session, "p3", "p1");
    vote(&mut session, "p4", "p3");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();

    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.total_exiles(), 2);
    assert_eq!(session.winners(), ["Player 1".to_string(), "Player 4".to_string()]);
}

#[test]
fn test_skip_round_abandons_an_open_vote() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();
    play_until_vote(&mut session);
    vote(&mut session, "p1", "p2");

    let outcome = session.apply_action(&pid("p1"), GameAction::DevSkipRound).unwrap();
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::RoundStart));
    assert_eq!(session.round(), 2);
    assert_eq!(session.phase(), Phase::Reveal);
    assert_eq!(session.vote_phase(), None);
    assert_eq!(session.current_turn(), Some(&pid("p1")));
    assert_eq!(session.total_exiles(), 0);
    assert_eq!(session.votes_remaining(), 1);
    assert!(session.players().all(|p| p.is_alive()));
}

#[test]
fn test_vote_validation() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();

    let early = session
        .apply_action(
            &pid("p1"),
            GameAction::Vote {
                target_player_id: pid("p2"),
            },
        )
        .unwrap_err();
    assert_eq!(early.kind(), GameErrorKind::PhaseMismatch);

    play_until_vote(&mut session);
    let own = session
        .apply_action(
            &pid("p1"),
            GameAction::Vote {
                target_player_id: pid("p1"),
            },
        )
        .unwrap_err();
    assert_eq!(own.kind(), GameErrorKind::PreconditionUnmet);

    vote(&mut session, "p1", "p2");
    let twice = session
        .apply_action(
            &pid("p1"),
            GameAction::Vote {
                target_player_id: pid("p3"),
            },
        )
        .unwrap_err();
    assert_eq!(twice.kind(), GameErrorKind::Conflict);
}

// ============================================================================
// Game end and post-game
// ============================================================================

/// Plays a one-round, two-vote game to its end: p4 then p3 are voted out.
fn ended_game() -> bunker_engine::GameSession {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[2], 2, 2)).build();
    play_until_vote(&mut session);
    for voter in ["p1", "p2", "p3"] {
        vote(&mut session, voter, "p4");
    }
    vote(&mut session, "p4", "p3");
    session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    session.apply_action(&pid("p1"), GameAction::ContinueRound).unwrap();
    assert_eq!(session.phase(), Phase::Voting);

    vote(&mut session, "p1", "p3");
    vote(&mut session, "p2", "p3");
    vote(&mut session, "p3", "p1");
    let outcome = session.apply_action(&pid("p1"), GameAction::FinalizeVoting).unwrap();
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::GameEnd));
    session
}

#[test]
fn test_game_ends_when_exile_budget_is_spent() {
    let session = ended_game();

    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.winners(), ["Player 1".to_string(), "Player 2".to_string()]);
    assert!(session.current_timer().is_none());
    assert!(session.current_turn().is_none());
    assert!(session.world().bunker.iter().all(|c| c.is_revealed));
    let post_game = session.post_game().unwrap();
    assert!(post_game.is_active);
    assert!(post_game.outcome.is_none());
}

#[test]
fn test_post_game_reveals_until_outcome_is_set() {
    let mut session = ended_game();
    let card = first_hidden(&session, "p2");
    session
        .apply_action(&pid("p2"), GameAction::RevealCard { card_id: card })
        .unwrap();

    let err = session
        .apply_action(
            &pid("p2"),
            GameAction::SetBunkerOutcome {
                outcome: BunkerOutcome::Survived,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);

    session
        .apply_action(
            &pid("p1"),
            GameAction::SetBunkerOutcome {
                outcome: BunkerOutcome::Survived,
            },
        )
        .unwrap();
    assert_eq!(session.post_game().unwrap().outcome, Some(BunkerOutcome::Survived));
    assert_eq!(session.post_game().unwrap().decided_by, Some(pid("p1")));
    assert_eq!(session.last_stage_text(), "Final: the bunker survived.");

    let twice = session
        .apply_action(
            &pid("p1"),
            GameAction::SetBunkerOutcome {
                outcome: BunkerOutcome::Failed,
            },
        )
        .unwrap_err();
    assert_eq!(twice.kind(), GameErrorKind::Conflict);

    let card = first_hidden(&session, "p1");
    let late = session
        .apply_action(&pid("p1"), GameAction::RevealCard { card_id: card })
        .unwrap_err();
    assert_eq!(late.kind(), GameErrorKind::Conflict);
}

#[test]
fn test_outcome_needs_an_ended_game() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let err = session
        .apply_action(
            &pid("p1"),
            GameAction::SetBunkerOutcome {
                outcome: BunkerOutcome::Failed,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PhaseMismatch);
}

#[test]
fn test_world_threats_are_revealed_by_the_host() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let before = session
        .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index: 0 })
        .unwrap_err();
    assert_eq!(before.kind(), GameErrorKind::PhaseMismatch);

    let mut session = ended_game();
    let guest = session
        .apply_action(&pid("p2"), GameAction::RevealWorldThreat { index: 0 })
        .unwrap_err();
    assert_eq!(guest.kind(), GameErrorKind::PermissionDenied);

    let first = session
        .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index: 0 })
        .unwrap();
    assert!(first.state_changed);
    assert!(session.world().threats[0].is_revealed);
    assert_eq!(session.world().threats[0].revealed_by, Some(pid("p1")));

    let repeat = session
        .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index: 0 })
        .unwrap();
    assert!(!repeat.state_changed);

    for index in [3, -1] {
        let err = session
            .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index })
            .unwrap_err();
        assert_eq!(err.kind(), GameErrorKind::PreconditionUnmet);
    }
}

#[test]
fn test_world_threats_may_be_revealed_in_any_order() {
    let mut session = ended_game();
    let last = session
        .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index: 2 })
        .unwrap();
    assert!(last.state_changed);
    assert!(session.world().threats[2].is_revealed);
    assert!(!session.world().threats[0].is_revealed);

    session
        .apply_action(&pid("p1"), GameAction::RevealWorldThreat { index: 0 })
        .unwrap();
    assert!(session.world().threats[0].is_revealed);
    assert!(!session.world().threats[1].is_revealed);
}

// ============================================================================
// Departures and removals
// ============================================================================

#[test]
fn test_leaving_mid_vote_skips_to_resolution() {
    let (mut session, _clock) = GameBuilder::new(4).ruleset(ruleset(4, &[1, 1], 2, 2)).build();
    play_until_vote(&mut session);
    vote(&mut session, "p1", "p2");

    let outcome = session
        .apply_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(pid("p4")),
            },
        )
        .unwrap();
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::PlayerLeftBunker));
    assert_eq!(session.phase(), Phase::Resolution);
    assert_eq!(session.vote_phase(), Some(VotePhase::Resolve));
    assert_eq!(session.total_exiles(), 1);
    assert_eq!(session.votes_remaining(), 0);
    assert_eq!(session.last_stage_text(), "Voting skipped: Player 4 left the game.");
    assert_eq!(session.current_timer().unwrap().kind, TimerKind::ResolutionAuto);

    let again = session
        .apply_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(pid("p4")),
            },
        )
        .unwrap_err();
    assert_eq!(again.kind(), GameErrorKind::Conflict);
}

#[test]
fn test_eliminated_player_may_still_leave_the_bunker() {
    let (mut session, _clock) = GameBuilder::new(5).ruleset(ruleset(5, &[1, 1], 3, 2)).build();
    session
        .apply_action(
            &pid("p1"),
            GameAction::DevKickPlayer {
                target_player_id: Some(pid("p4")),
            },
        )
        .unwrap();
    let exiles = session.total_exiles();
    let votes = session.votes_remaining();
    assert_eq!(exiles, 1);

    let outcome = session
        .apply_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(pid("p4")),
            },
        )
        .unwrap();
    assert!(outcome.events.iter().any(|e| e.kind == EventKind::PlayerLeftBunker));
    assert_eq!(session.player(&pid("p4")).unwrap().status, PlayerStatus::LeftBunker);
    assert_eq!(session.total_exiles(), exiles);
    assert_eq!(session.votes_remaining(), votes);
    assert_eq!(session.phase(), Phase::Reveal);
}

#[test]
fn test_kick_passes_the_turn_on() {
    let (mut session, _clock) = GameBuilder::new(5).build();
    let outcome = session
        .apply_action(
            &pid("p1"),
            GameAction::DevKickPlayer {
                target_player_id: Some(pid("p1")),
            },
        )
        .unwrap();

    assert!(outcome.events.iter().any(|e| e.kind == EventKind::Elimination));
    assert!(!session.player(&pid("p1")).unwrap().is_alive());
    assert_eq!(session.current_turn(), Some(&pid("p2")));
    assert_eq!(session.phase(), Phase::Reveal);

    let twice = session
        .apply_action(
            &pid("p2"),
            GameAction::DevKickPlayer {
                target_player_id: Some(pid("p1")),
            },
        )
        .unwrap_err();
    assert_eq!(twice.kind(), GameErrorKind::Conflict);
}

#[test]
fn test_sandbox_actions_need_the_sandbox() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let err = session
        .apply_action(&pid("p1"), GameAction::DevAddPlayer { name: None })
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::Unsupported);
}

#[test]
fn test_unknown_actor_is_not_found() {
    let (mut session, _clock) = GameBuilder::new(4).build();
    let err = session
        .apply_action(&pid("ghost"), GameAction::ContinueRound)
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::NotFound);
}
