//! `BunkerServer`: catalogs loaded once, rooms, and the wire entry point.
//!
//! Transports stay outside this crate. A connection task decodes nothing
//! itself; it hands each inbound frame to [`BunkerServer::handle_frame`] and
//! forwards whatever the player's [`RoomOutbound`](bunker_room::RoomOutbound)
//! channel yields.

use bunker_catalog::{AbilityCatalog, AssetCatalog};
use bunker_protocol::{ActionResult, Codec, JsonCodec, PlayerId};
use bunker_room::{GameResources, RoomManager};
use tokio::sync::Mutex;

use crate::{BunkerError, ServerConfig};

pub struct BunkerServer<C: Codec = JsonCodec> {
    config: ServerConfig,
    rooms: Mutex<RoomManager>,
    codec: C,
}

impl BunkerServer<JsonCodec> {
    /// Loads catalogs from `config` and starts with no rooms.
    ///
    /// A missing deck directory leaves the asset catalog empty (hands are
    /// dealt placeholder cards); a broken ability file falls back to the
    /// built-in table. Both are logged.
    pub fn new(config: ServerConfig) -> Self {
        let assets = match AssetCatalog::load(&config.assets_root) {
            Ok(assets) => assets,
            Err(err) => {
                tracing::warn!(
                    root = %config.assets_root.display(),
                    error = %err,
                    "asset catalog unavailable, dealing placeholder cards"
                );
                AssetCatalog::default()
            }
        };
        let abilities = AbilityCatalog::load_or_builtin(config.specials_file.as_deref());
        Self::with_catalogs(config, assets, abilities)
    }

    /// Starts with catalogs the caller already built.
    pub fn with_catalogs(config: ServerConfig, assets: AssetCatalog, abilities: AbilityCatalog) -> Self {
        let resources = GameResources::new(assets, abilities).with_seed(config.seed);
        Self::with_resources(config, resources, JsonCodec)
    }
}

impl<C: Codec> BunkerServer<C> {
    pub fn with_resources(config: ServerConfig, resources: GameResources, codec: C) -> Self {
        let rooms = RoomManager::new(config.room.clone(), resources);
        tracing::info!(
            dev_scenarios = config.enable_dev_scenarios,
            seed = config.seed,
            "bunker server ready"
        );
        Self {
            config,
            rooms: Mutex::new(rooms),
            codec,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The room manager. Hold the lock only for the duration of one call.
    pub fn rooms(&self) -> &Mutex<RoomManager> {
        &self.rooms
    }

    /// Decodes one action frame from `player`, applies it, and encodes the
    /// wire result `{stateChanged, events, error?}`.
    ///
    /// Rejections of any kind become an `error` in the result. Only a
    /// failure to encode the result itself is returned as `Err`.
    pub async fn handle_frame(&self, player: &PlayerId, frame: &[u8]) -> Result<Vec<u8>, BunkerError> {
        let result = match self.codec.decode_action(frame) {
            Ok(action) => {
                let name = action.name();
                let routed = self.rooms.lock().await.route_action(player, action).await;
                match routed {
                    Ok(outcome) => ActionResult::from(outcome),
                    Err(err) => {
                        tracing::debug!(player = %player, action = name, error = %err, "frame rejected");
                        ActionResult::failed(err.to_string())
                    }
                }
            }
            Err(err) => {
                tracing::debug!(player = %player, error = %err, "undecodable frame");
                ActionResult::failed(err.to_string())
            }
        };
        Ok(self.codec.encode(&result)?)
    }
}
