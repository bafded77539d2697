//! Room manager: allocates room codes and routes players to their room.

use std::collections::HashMap;

use bunker_engine::GameView;
use bunker_protocol::{ActionOutcome, GameAction, PlayerId, RoomCode};
use rand::Rng;

use crate::room::spawn_room;
use crate::{
    GameResources, LeaveOutcome, LobbySettings, LobbyUpdate, PlayerSender, RoomConfig, RoomError,
    RoomHandle, RoomInfo,
};

const CODE_LEN: usize = 4;

/// Owns every live room and the player → room index.
///
/// A player is in at most one room at a time.
pub struct RoomManager {
    config: RoomConfig,
    resources: GameResources,
    rooms: HashMap<RoomCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomCode>,
}

impl RoomManager {
    pub fn new(config: RoomConfig, resources: GameResources) -> Self {
        Self {
            config,
            resources,
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room with `host` as its first member and host.
    pub async fn create_room(
        &mut self,
        host: PlayerId,
        name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<RoomCode, RoomError> {
        self.ensure_roomless(&host)?;

        let code = self.fresh_code();
        let handle = spawn_room(code.clone(), self.config.clone(), self.resources.clone());
        tracing::info!(room = %code, host = %host, "room created");

        if let Err(err) = handle.join(host.clone(), name, sender).await {
            let _ = handle.shutdown().await;
            return Err(err);
        }
        self.rooms.insert(code.clone(), handle);
        self.player_rooms.insert(host, code.clone());
        Ok(code)
    }

    /// Joins a lobby, or reconnects a seated player to their running game.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        name: impl Into<String>,
        code: &RoomCode,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let code = normalize_code(code);
        if let Some(current) = self.player_rooms.get(&player_id) {
            if *current != code {
                return Err(RoomError::InvalidState(format!(
                    "player {player_id} is already in room {current}"
                )));
            }
        }

        let handle = self.handle(&code)?;
        handle.join(player_id.clone(), name, sender).await?;
        self.player_rooms.insert(player_id, code);
        Ok(())
    }

    /// Leaves the player's room. Rooms left with nobody connected close.
    pub async fn leave_room(&mut self, player_id: &PlayerId) -> Result<LeaveOutcome, RoomError> {
        let code = self.room_of(player_id)?.clone();
        let handle = self.handle(&code)?;
        let outcome = handle.leave(player_id.clone()).await?;

        if outcome.removed {
            self.player_rooms.remove(player_id);
        }
        if outcome.room_empty {
            self.destroy_room(&code).await?;
        }
        Ok(outcome)
    }

    pub async fn configure(
        &self,
        player_id: &PlayerId,
        update: LobbyUpdate,
    ) -> Result<LobbySettings, RoomError> {
        self.player_handle(player_id)?
            .configure(player_id.clone(), update)
            .await
    }

    pub async fn start_game(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        self.player_handle(player_id)?
            .start_game(player_id.clone())
            .await
    }

    /// Routes a game action to the player's room.
    pub async fn route_action(
        &self,
        player_id: &PlayerId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        self.player_handle(player_id)?
            .act(player_id.clone(), action)
            .await
    }

    pub async fn game_view(&self, player_id: &PlayerId) -> Result<GameView, RoomError> {
        self.player_handle(player_id)?
            .game_view(player_id.clone())
            .await
    }

    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        self.handle(&normalize_code(code))?.info().await
    }

    /// Shuts a room down and forgets everyone in it.
    pub async fn destroy_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, room| room != code);
        tracing::info!(room = %code, "room destroyed");
        Ok(())
    }

    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(player_id)
    }

    pub fn room_handle(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(&normalize_code(code)).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }

    // -- helpers ------------------------------------------------------------

    fn ensure_roomless(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        match self.player_rooms.get(player_id) {
            Some(current) => Err(RoomError::AlreadyInRoom(player_id.clone(), current.clone())),
            None => Ok(()),
        }
    }

    fn room_of(&self, player_id: &PlayerId) -> Result<&RoomCode, RoomError> {
        self.player_rooms.get(player_id).ok_or_else(|| {
            RoomError::InvalidState(format!("player {player_id} is not in any room"))
        })
    }

    fn handle(&self, code: &RoomCode) -> Result<&RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    fn player_handle(&self, player_id: &PlayerId) -> Result<&RoomHandle, RoomError> {
        let code = self.room_of(player_id)?;
        self.handle(code)
    }

    /// Four random uppercase letters not used by a live room.
    fn fresh_code(&self) -> RoomCode {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
                .collect();
            let code = RoomCode::new(code);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

/// Codes are matched case-insensitively and without surrounding spaces.
fn normalize_code(code: &RoomCode) -> RoomCode {
    RoomCode::new(code.as_str().trim().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(&RoomCode::new(" abcd ")), RoomCode::new("ABCD"));
    }
}
