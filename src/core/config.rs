use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bevy_utils::tracing::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::player::PlayerState;

pub const CONFIG_ENV: &str = "KINGDOM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./assets/config/engine.json";
const DEFAULT_CONTENT_PATH: &str = "./assets/data/kingdom.json";

/// Engine settings. Every field has a default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub content_path: String,
    pub log_filter: String,
    pub starting_resources: BTreeMap<String, f64>,
    pub starting_stats: BTreeMap<String, f64>,
    pub starting_population: BTreeMap<String, u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_path: DEFAULT_CONTENT_PATH.to_string(),
            log_filter: "info".to_string(),
            starting_resources: BTreeMap::from([("gold".to_string(), 10.0), ("ap".to_string(), 0.0)]),
            starting_stats: BTreeMap::new(),
            starting_population: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Fresh player with the configured baseline quantities.
    pub fn starting_player(&self, name: impl Into<String>) -> PlayerState {
        let mut player = PlayerState::new(name);
        player.resources = self.starting_resources.clone();
        player.stats = self.starting_stats.clone();
        player.population = self.starting_population.clone();
        player
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Config path from `KINGDOM_CONFIG`, falling back to the bundled location.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load config from `path`. A missing file yields defaults; an unreadable or
/// malformed one is an error.
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "config file missing, using defaults");
        return Ok(EngineConfig::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}
