//! End-to-end tests through the facade: frames in, wire results out.

use bunker::prelude::*;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn catalog() -> AssetCatalog {
    let mut files: Vec<(String, String)> = Vec::new();
    for deck in ["Профессия", "Здоровье", "Хобби", "Багаж", "Факты", "Биология"] {
        for n in 1..=30 {
            files.push((deck.to_string(), format!("{deck} {n}.png")));
        }
    }
    files.push(("Катастрофы".to_string(), "Потоп.png".to_string()));
    for n in 1..=8 {
        files.push(("Бункер".to_string(), format!("Комната {n}.png")));
        files.push(("Угрозы".to_string(), format!("Угроза {n}.png")));
    }
    AssetCatalog::from_files(files)
}

fn server() -> BunkerServer {
    let config = ServerConfig {
        seed: 5,
        ..ServerConfig::default()
    };
    BunkerServer::with_catalogs(config, catalog(), AbilityCatalog::builtin())
}

fn decode(server: &BunkerServer, bytes: &[u8]) -> ActionResult {
    server.codec().decode(bytes).unwrap()
}

/// Four seated players with a started classic game.
async fn started(server: &BunkerServer) -> Vec<mpsc::UnboundedReceiver<RoomOutbound>> {
    let mut rooms = server.rooms().lock().await;
    let mut receivers = Vec::new();
    let (tx, rx) = mpsc::unbounded_channel();
    receivers.push(rx);
    let code = rooms.create_room(PlayerId::new("p1"), "One", tx).await.unwrap();
    for i in 2..=4 {
        let (tx, rx) = mpsc::unbounded_channel();
        receivers.push(rx);
        rooms
            .join_room(PlayerId::new(format!("p{i}")), format!("Player {i}"), &code, tx)
            .await
            .unwrap();
    }
    rooms.start_game(&PlayerId::new("p1")).await.unwrap();
    receivers
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_missing_assets_fall_back_to_an_empty_catalog() {
    let config = ServerConfig {
        assets_root: std::env::temp_dir().join("bunker-no-such-assets-root"),
        ..ServerConfig::default()
    };
    let server = BunkerServer::new(config);
    assert_eq!(server.rooms().lock().await.room_count(), 0);
}

#[tokio::test]
async fn test_frame_from_roomless_player_is_an_error_result() {
    let server = server();
    let frame = br#"{"type":"continueRound"}"#;
    let bytes = server.handle_frame(&PlayerId::new("ghost"), frame).await.unwrap();
    let result = decode(&server, &bytes);
    assert!(result.is_error());
    assert!(result.error.unwrap().contains("not in any room"));
}

#[tokio::test]
async fn test_garbage_frame_is_an_error_result() {
    let server = server();
    let bytes = server
        .handle_frame(&PlayerId::new("p1"), b"   ")
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["stateChanged"], false);
    assert!(json["error"].as_str().unwrap().contains("empty action frame"));
}

#[tokio::test]
async fn test_reveal_frame_changes_state_and_reports_events() {
    let server = server();
    let mut receivers = started(&server).await;

    let view = server
        .rooms()
        .lock()
        .await
        .game_view(&PlayerId::new("p1"))
        .await
        .unwrap();
    let card = view.you.hand[0].instance_id.clone();
    let frame = serde_json::to_vec(&GameAction::RevealCard { card_id: card }).unwrap();

    let bytes = server.handle_frame(&PlayerId::new("p1"), &frame).await.unwrap();
    let result = decode(&server, &bytes);
    assert!(result.state_changed);
    assert!(result.error.is_none());

    let mut saw_discussion = false;
    while let Ok(msg) = receivers[3].try_recv() {
        if let RoomOutbound::View(view) = msg {
            saw_discussion |= view.phase == Phase::RevealDiscussion;
        }
    }
    assert!(saw_discussion);
}

#[tokio::test]
async fn test_out_of_turn_frame_is_rejected_for_the_actor() {
    let server = server();
    let _receivers = started(&server).await;

    let frame = serde_json::to_vec(&GameAction::ContinueRound).unwrap();
    let bytes = server.handle_frame(&PlayerId::new("p2"), &frame).await.unwrap();
    let result = decode(&server, &bytes);
    assert!(result.is_error());
    assert!(!result.state_changed);
    assert!(result.events.is_empty());
}
