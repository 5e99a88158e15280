//! Configuration management for the Horizon interest simulator.
//!
//! This module handles loading and validation of the simulator configuration
//! from TOML files. The `[interest]` table is handed to the interest engine
//! unchanged.

use horizon_interest::InterestConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_tick_rate_hz() -> u32 {
    20
}

fn default_players() -> usize {
    16
}

fn default_props() -> usize {
    400
}

fn default_scenes() -> usize {
    4
}

fn default_matches() -> usize {
    2
}

fn default_world_extent() -> f64 {
    200.0
}

fn default_player_speed() -> f64 {
    8.0
}

fn default_scene_hop_interval() -> u64 {
    100
}

fn default_churn_interval() -> u64 {
    150
}

fn default_stats_interval_secs() -> u64 {
    10
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Interest engine settings
    #[serde(default)]
    pub interest: InterestConfig,
    /// Simulated world settings
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Logging system configuration.
///
/// Controls log output format and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
    /// Level for the `horizon_interest` target; falls back to `level`
    #[serde(default)]
    pub engine_level: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            engine_level: None,
        }
    }
}

/// Shape of the simulated world the engine runs against.
///
/// Players are spread evenly across scenes and matches; props are laid out
/// on a fixed pattern so runs are repeatable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Simulation ticks per second
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// Player entities, each owned by one connection
    #[serde(default = "default_players")]
    pub players: usize,
    /// Unowned entities
    #[serde(default = "default_props")]
    pub props: usize,
    /// Number of scenes entities are spread across
    #[serde(default = "default_scenes")]
    pub scenes: usize,
    /// Number of matches entities are spread across
    #[serde(default = "default_matches")]
    pub matches: usize,
    /// Side length of the square world, centered on the origin
    #[serde(default = "default_world_extent")]
    pub world_extent: f64,
    /// Player movement speed in units per second
    #[serde(default = "default_player_speed")]
    pub player_speed: f64,
    /// Every this many ticks one prop moves to the next scene (0 disables)
    #[serde(default = "default_scene_hop_interval")]
    pub scene_hop_interval: u64,
    /// Every this many ticks one prop is respawned and one player reconnects (0 disables)
    #[serde(default = "default_churn_interval")]
    pub churn_interval: u64,
    /// Stop after this many ticks (None runs until a shutdown signal)
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Seconds between engine statistics reports
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            players: default_players(),
            props: default_props(),
            scenes: default_scenes(),
            matches: default_matches(),
            world_extent: default_world_extent(),
            player_speed: default_player_speed(),
            scene_hop_interval: default_scene_hop_interval(),
            churn_interval: default_churn_interval(),
            max_ticks: None,
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl SimulationSettings {
    /// Duration of one tick in seconds.
    pub fn tick_seconds(&self) -> f64 {
        1.0 / f64::from(self.tick_rate_hz.max(1))
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }
        if let Some(engine_level) = &self.logging.engine_level {
            if !valid_levels.contains(&engine_level.as_str()) {
                return Err(format!(
                    "Invalid engine log level: {engine_level}. Must be one of: {valid_levels:?}"
                ));
            }
        }

        self.interest.validate().map_err(|e| format!("interest: {e}"))?;

        let sim = &self.simulation;
        if sim.tick_rate_hz == 0 {
            return Err("simulation.tick_rate_hz must be greater than 0".to_string());
        }
        if sim.scenes == 0 {
            return Err("simulation.scenes must be greater than 0".to_string());
        }
        if sim.matches == 0 {
            return Err("simulation.matches must be greater than 0".to_string());
        }
        if !sim.world_extent.is_finite() || sim.world_extent <= 0.0 {
            return Err(format!("simulation.world_extent must be positive, got {}", sim.world_extent));
        }
        if !sim.player_speed.is_finite() || sim.player_speed < 0.0 {
            return Err(format!("simulation.player_speed must be non-negative, got {}", sim.player_speed));
        }
        if sim.stats_interval_secs == 0 {
            return Err("simulation.stats_interval_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
