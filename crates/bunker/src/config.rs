//! Environment-driven server configuration.

use std::path::PathBuf;

use bunker_room::RoomConfig;

/// Where catalogs live and which scenarios rooms may run.
///
/// Build one with [`from_env`](Self::from_env), or start from `Default`
/// and set fields directly.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `decks/`. `BUNKER_ASSETS_ROOT`, default `assets`.
    pub assets_root: PathBuf,

    /// Ability definition file. `BUNKER_SPECIALS_FILE`; unset means the
    /// built-in table.
    pub specials_file: Option<PathBuf>,

    /// Allow the `dev_test` sandbox. `BUNKER_ENABLE_DEV_SCENARIOS`.
    pub enable_dev_scenarios: bool,

    /// Fixed dealing seed, 0 for entropy. `BUNKER_SEED`.
    pub seed: u64,

    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("assets"),
            specials_file: None,
            enable_dev_scenarios: false,
            seed: 0,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the `BUNKER_*` variables, keeping defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup("BUNKER_ASSETS_ROOT").filter(|v| !v.trim().is_empty()) {
            config.assets_root = PathBuf::from(root.trim());
        }
        config.specials_file = lookup("BUNKER_SPECIALS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(|v| PathBuf::from(v.trim()));
        config.enable_dev_scenarios = lookup("BUNKER_ENABLE_DEV_SCENARIOS")
            .is_some_and(|v| parse_flag(&v));
        if let Some(raw) = lookup("BUNKER_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = seed,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid BUNKER_SEED"),
            }
        }

        config.room.allow_dev_scenarios = config.enable_dev_scenarios;
        config
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
