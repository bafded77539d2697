//! The sandbox decorator: bots, relaxed rules and its own end condition.

mod common;

use bunker_engine::{
    DEV_BUNKER_CAPACITY, DevTestSession, GameEngine, GameErrorKind, Phase, PlayerStatus, Scenario, VotePhase,
};
use bunker_protocol::{EventKind, GameAction, PlayerId};
use common::{GameBuilder, first_hidden, pid, ruleset};

fn sandbox(bots: usize, votes: &[u32]) -> DevTestSession {
    let (core, _clock) = GameBuilder::new(1)
        .scenario(Scenario::DevTest)
        .ruleset(ruleset(1 + bots as u32, votes, bots as u32, 1))
        .build();
    let mut session = DevTestSession::new(core);
    for _ in 0..bots {
        session
            .handle_action(&pid("p1"), GameAction::DevAddPlayer { name: None })
            .unwrap();
    }
    session
}

fn bot(n: usize) -> PlayerId {
    PlayerId::new(format!("dev-abcd-{n}"))
}

fn human_reveal(session: &mut DevTestSession) {
    let card = first_hidden(session.core(), "p1");
    session
        .handle_action(&pid("p1"), GameAction::RevealCard { card_id: card })
        .unwrap();
}

#[test]
fn test_bots_are_seated_with_sandbox_abilities() {
    let session = sandbox(2, &[1, 1]);
    let core = session.core();

    let first = core.player(&bot(1)).unwrap();
    assert!(first.is_bot);
    assert_eq!(first.name, "DEV Игрок 1");
    assert_eq!(first.hand.len(), 7);

    let p1 = core.player(&pid("p1")).unwrap();
    assert_eq!(p1.specials.len(), 2);
    assert!(p1.specials.iter().all(|s| s.revealed_public));
    assert_eq!(p1.specials[1].definition.id, "dev-choice-p1");
    assert!(p1.specials[1].definition.title.ends_with("(DEV)"));
}

#[test]
fn test_bot_reveals_on_its_turn() {
    let mut session = sandbox(2, &[1, 1]);
    human_reveal(&mut session);
    session.handle_action(&pid("p1"), GameAction::ContinueRound).unwrap();

    let core = session.core();
    assert!(core.has_revealed_this_round(&bot(1)));
    assert!(!core.has_revealed_this_round(&bot(2)));
    assert_eq!(session.phase(), Phase::RevealDiscussion);
}

#[test]
fn test_kick_is_not_available() {
    let mut session = sandbox(2, &[1, 1]);
    let err = session
        .handle_action(
            &pid("p1"),
            GameAction::DevKickPlayer {
                target_player_id: Some(bot(1)),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::Unsupported);
}

#[test]
fn test_skip_round_is_host_only_and_opens_the_vote() {
    let mut session = sandbox(2, &[1, 1]);

    let err = session.handle_action(&bot(1), GameAction::DevSkipRound).unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);

    session.handle_action(&pid("p1"), GameAction::DevSkipRound).unwrap();
    assert_eq!(session.phase(), Phase::Voting);
    assert_eq!(session.core().vote_phase(), Some(VotePhase::Voting));

    let again = session.handle_action(&pid("p1"), GameAction::DevSkipRound).unwrap_err();
    assert_eq!(again.kind(), GameErrorKind::PhaseMismatch);
}

#[test]
fn test_finalize_needs_the_window() {
    let mut session = sandbox(2, &[1, 1]);
    let err = session
        .handle_action(&pid("p1"), GameAction::FinalizeVoting)
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PhaseMismatch);
}

#[test]
fn test_leaving_only_changes_status() {
    let mut session = sandbox(2, &[1, 1]);
    session
        .handle_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(bot(2)),
            },
        )
        .unwrap();

    let core = session.core();
    assert_eq!(session.player_status(&bot(2)), Some(PlayerStatus::LeftBunker));
    assert_eq!(core.total_exiles(), 0);
    assert_eq!(core.votes_remaining(), 1);

    let err = session
        .handle_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(bot(2)),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::NotFound);
}

#[test]
fn test_departed_player_cannot_act() {
    let mut session = sandbox(2, &[1, 1]);
    session
        .handle_action(
            &pid("p1"),
            GameAction::MarkLeftBunker {
                target_player_id: Some(bot(1)),
            },
        )
        .unwrap();
    let err = session
        .handle_action(&bot(1), GameAction::ContinueRound)
        .unwrap_err();
    assert_eq!(err.kind(), GameErrorKind::PermissionDenied);
}

#[test]
fn test_remove_takes_the_last_bot() {
    let mut session = sandbox(3, &[1, 1]);
    let outcome = session
        .handle_action(&pid("p1"), GameAction::DevRemovePlayer { target_player_id: None })
        .unwrap();

    assert!(outcome.events.iter().any(|e| e.message == "Removed player DEV Игрок 3."));
    assert!(session.core().player(&bot(3)).is_none());
    assert_eq!(session.core().players().count(), 3);
}

#[test]
fn test_game_ends_at_bunker_capacity() {
    let mut session = sandbox(5, &[1, 1, 1]);
    assert_eq!(session.core().players().count(), DEV_BUNKER_CAPACITY + 1);

    let mut ended = false;
    for _ in 0..100 {
        let human_alive = session.player_status(&pid("p1")) == Some(PlayerStatus::Alive);
        let outcome = match (session.phase(), session.core().vote_phase()) {
            (Phase::Ended, _) => break,
            (Phase::Reveal, _) => {
                assert_eq!(session.core().current_turn(), Some(&pid("p1")));
                human_reveal(&mut session);
                continue;
            }
            (Phase::Voting, Some(VotePhase::SpecialWindow)) | (Phase::RevealDiscussion | Phase::Resolution, _) => {
                session.handle_action(&pid("p1"), GameAction::ContinueRound)
            }
            (Phase::Voting, _) if human_alive => {
                let targets: Vec<PlayerId> = session
                    .core()
                    .players()
                    .filter(|p| p.is_alive() && p.id != pid("p1"))
                    .map(|p| p.id.clone())
                    .collect();
                let mut cast = None;
                for target in targets {
                    if let Ok(outcome) = session.handle_action(
                        &pid("p1"),
                        GameAction::Vote {
                            target_player_id: target,
                        },
                    ) {
                        cast = Some(outcome);
                        break;
                    }
                }
                Ok(cast.expect("some candidate accepts the vote"))
            }
            other => panic!("stuck in {other:?}"),
        };
        let outcome = outcome.unwrap();
        if outcome.events.iter().any(|e| e.kind == EventKind::GameEnd) {
            assert!(outcome
                .events
                .iter()
                .any(|e| e.message.ends_with("(dev_test_bunker_capacity)")));
            ended = true;
        }
    }

    assert!(ended);
    assert_eq!(session.phase(), Phase::Ended);
    let alive = session.core().players().filter(|p| p.is_alive()).count();
    assert_eq!(alive, DEV_BUNKER_CAPACITY);
    assert_eq!(session.core().total_exiles(), 1);
}
