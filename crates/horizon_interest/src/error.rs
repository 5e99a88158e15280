//! Error types for the interest engine.
//!
//! Strategy failures are scoped to a single entity and never abort a rebuild;
//! configuration errors surface when a config is validated.

use crate::types::{EntityId, Vec3};

/// A failure while computing the candidate observers of one entity.
///
/// The engine logs these and leaves the entity's observer set untouched for
/// the current rebuild.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    /// Position contains NaN or infinity and cannot be measured
    #[error("entity {entity} has a non-finite position {position:?}")]
    NonFinitePosition { entity: EntityId, position: Vec3 },

    /// Position quantizes outside the addressable grid
    #[error("entity {entity} at {position:?} falls outside the spatial grid")]
    OutOfGrid { entity: EntityId, position: Vec3 },
}

/// Invalid interest configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("update interval must be finite and non-negative, got {0}")]
    InvalidUpdateInterval(f64),

    #[error("visibility radius must be finite and greater than 0, got {0}")]
    InvalidVisibilityRadius(f64),
}
