//! Plays one `dev_test` game end to end with a single human seat and bots.
//!
//! Catalogs come from `BUNKER_ASSETS_ROOT` / `BUNKER_SPECIALS_FILE` when
//! present; without decks on disk a small generated deck set is used.
//!
//! ```text
//! RUST_LOG=debug cargo run -p headless-dev -- 6
//! ```

use bunker::engine::ManualRulesConfig;
use bunker::prelude::*;
use tokio::sync::mpsc;

const MAX_STEPS: usize = 500;

fn generated_catalog() -> AssetCatalog {
    let mut files: Vec<(String, String)> = Vec::new();
    for deck in ["Профессия", "Здоровье", "Хобби", "Багаж", "Факты"] {
        for n in 1..=24 {
            files.push((deck.to_string(), format!("{deck} {n}.png")));
        }
    }
    for age in 18..=80 {
        files.push(("Биология".to_string(), format!("Возраст {age}.png")));
    }
    files.push(("Катастрофы".to_string(), "Ядерная зима.png".to_string()));
    for n in 1..=6 {
        files.push(("Бункер".to_string(), format!("Бункер {n}.png")));
        files.push(("Угрозы".to_string(), format!("Угроза {n}.png")));
    }
    AssetCatalog::from_files(files)
}

#[tokio::main]
async fn main() -> Result<(), BunkerError> {
    bunker::init_tracing();

    let bots: usize = std::env::args()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .unwrap_or(5)
        .clamp(1, 15);

    let mut config = ServerConfig::from_env();
    config.enable_dev_scenarios = true;
    config.room.allow_dev_scenarios = true;

    let assets = AssetCatalog::load(&config.assets_root).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "no decks on disk, using a generated deck set");
        generated_catalog()
    });
    let abilities = AbilityCatalog::load_or_builtin(config.specials_file.as_deref());
    let server = BunkerServer::with_catalogs(config, assets, abilities);

    let host = PlayerId::new("host");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut rooms = server.rooms().lock().await;
    let code = rooms.create_room(host.clone(), "Host", tx).await?;
    rooms
        .configure(
            &host,
            LobbyUpdate {
                scenario: Some(Scenario::DevTest),
                ruleset: Some(RulesetChoice::Manual(ManualRulesConfig {
                    bunker_slots: 2,
                    votes_by_round: vec![0, 1, 1, 1, 1],
                    ..ManualRulesConfig::default()
                })),
                ..LobbyUpdate::default()
            },
        )
        .await?;
    rooms.start_game(&host).await?;
    for _ in 0..bots {
        rooms
            .route_action(&host, GameAction::DevAddPlayer { name: None })
            .await?;
    }
    tracing::info!(room = %code, bots, "sandbox seated");

    let mut steps = 0;
    let mut failures = 0;
    while steps < MAX_STEPS && failures < 3 {
        steps += 1;
        let view = rooms.game_view(&host).await?;
        let host_alive = view
            .public
            .players
            .iter()
            .any(|p| p.player_id == host && p.status == PlayerStatus::Alive);
        let action = match (view.phase, view.public.vote_phase) {
            (Phase::Ended, _) => break,
            (Phase::Reveal, _) if view.public.current_turn_player_id.as_ref() == Some(&host) => {
                match view.you.hand.iter().find(|c| !c.revealed) {
                    Some(card) => GameAction::RevealCard {
                        card_id: card.instance_id.clone(),
                    },
                    None => GameAction::DevSkipRound,
                }
            }
            (Phase::Reveal, _) => GameAction::DevSkipRound,
            (Phase::Voting, Some(VotePhase::Voting)) if host_alive && !view.public.voting.as_ref().is_some_and(|v| v.has_voted) => {
                let target = view
                    .public
                    .players
                    .iter()
                    .find(|p| p.player_id != host && p.status == PlayerStatus::Alive)
                    .map(|p| p.player_id.clone());
                match target {
                    Some(target_player_id) => GameAction::Vote { target_player_id },
                    None => GameAction::FinalizeVoting,
                }
            }
            (Phase::Voting, Some(VotePhase::Voting)) => GameAction::FinalizeVoting,
            _ => GameAction::ContinueRound,
        };

        let name = action.name();
        match rooms.route_action(&host, action).await {
            Ok(outcome) => {
                failures = 0;
                for event in &outcome.events {
                    tracing::info!(kind = ?event.kind, "{}", event.message);
                }
            }
            Err(err) => {
                tracing::warn!(action = name, error = %err, "host action rejected");
                failures += 1;
            }
        }
    }
    while rx.try_recv().is_ok() {}

    let view = rooms.game_view(&host).await?;
    let summary = serde_json::json!({
        "room": code,
        "phase": view.phase,
        "round": view.round,
        "steps": steps,
        "winners": view.public.winners,
        "lastStageText": view.last_stage_text,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| summary.to_string())
    );
    Ok(())
}
