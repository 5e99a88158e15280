//! Interest engine configuration.
//!
//! Mirrors the layout of the server configuration: plain serde structs with
//! defaults, validated once at startup.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_update_interval_secs() -> f64 {
    1.0
}

fn default_visibility_radius() -> f64 {
    30.0
}

/// Which visibility policy the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Brute-force distance check against every connection
    #[default]
    Distance,
    /// Full visibility inside a scene
    Scene,
    /// Full visibility inside a match
    Match,
    /// 3x3 grid-cell neighborhood around each entity
    SpatialHash,
    /// Same scene, then a distance check
    SceneDistance,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Distance => "distance",
            StrategyKind::Scene => "scene",
            StrategyKind::Match => "match",
            StrategyKind::SpatialHash => "spatial_hash",
            StrategyKind::SceneDistance => "scene_distance",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(StrategyKind::Distance),
            "scene" => Ok(StrategyKind::Scene),
            "match" => Ok(StrategyKind::Match),
            "spatial_hash" => Ok(StrategyKind::SpatialHash),
            "scene_distance" => Ok(StrategyKind::SceneDistance),
            other => Err(format!(
                "unknown strategy '{other}', expected one of: distance, scene, match, spatial_hash, scene_distance"
            )),
        }
    }
}

/// Axis pair used to project positions onto the spatial grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMethod {
    /// Ground plane of a 3D world (x, z)
    #[default]
    Xz,
    /// Screen plane of a 2D world (x, y)
    Xy,
}

/// Interest engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestConfig {
    /// Active visibility strategy
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Seconds between interval rebuilds (0 rebuilds every tick)
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: f64,
    /// Default visibility range, and the grid radius for the spatial hash
    #[serde(default = "default_visibility_radius")]
    pub visibility_radius: f64,
    /// Grid projection for the spatial hash
    #[serde(default)]
    pub check_method: CheckMethod,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            update_interval_secs: default_update_interval_secs(),
            visibility_radius: default_visibility_radius(),
            check_method: CheckMethod::default(),
        }
    }
}

impl InterestConfig {
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_update_interval(mut self, seconds: f64) -> Self {
        self.update_interval_secs = seconds;
        self
    }

    pub fn with_visibility_radius(mut self, radius: f64) -> Self {
        self.visibility_radius = radius;
        self
    }

    pub fn with_check_method(mut self, method: CheckMethod) -> Self {
        self.check_method = method;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.update_interval_secs.is_finite() || self.update_interval_secs < 0.0 {
            return Err(ConfigError::InvalidUpdateInterval(self.update_interval_secs));
        }

        if !self.visibility_radius.is_finite() || self.visibility_radius <= 0.0 {
            return Err(ConfigError::InvalidVisibilityRadius(self.visibility_radius));
        }

        Ok(())
    }
}
