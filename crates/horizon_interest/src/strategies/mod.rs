//! # Visibility Strategies
//!
//! Each strategy answers one question: which connections should currently
//! observe which entities. The engine owns the observer sets and the
//! show/hide transitions; strategies only produce candidate sets.
//!
//! | Strategy | Pre-filter | Fine filter | Cost per rebuild |
//! |---|---|---|---|
//! | [`DistanceStrategy`] | none | distance `<=` range | O(entities x connections) |
//! | [`SceneStrategy`] | scene | none | dirty scenes only |
//! | [`MatchStrategy`] | match | none | dirty matches only |
//! | [`SpatialHashStrategy`] | 3x3 grid cells | none | O(entities + connections) |
//! | [`SceneDistanceStrategy`] | scene | distance `<` range | O(sum of scene sizes squared) |

use crate::config::{InterestConfig, StrategyKind};
use crate::error::StrategyError;
use crate::types::{Connection, ConnectionId, Entity, EntityId, World};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

mod distance;
mod matches;
mod partitioned;
mod scene;
mod scene_distance;
mod spatial_hash;

pub use distance::DistanceStrategy;
pub use matches::MatchStrategy;
pub use scene::SceneStrategy;
pub use scene_distance::SceneDistanceStrategy;
pub use spatial_hash::SpatialHashStrategy;

/// How much of the world a rebuild covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebuildScope {
    /// Interval rebuild: partitioned strategies recompute dirty partitions only
    Dirty,
    /// On-demand rebuild: every entity is recomputed
    Full,
}

/// Candidate observers produced by a strategy for one rebuild.
///
/// Entities missing from the batch keep their current observers.
#[derive(Debug, Default)]
pub struct CandidateBatch {
    candidates: HashMap<EntityId, HashSet<ConnectionId>>,
    failures: Vec<(EntityId, StrategyError)>,
}

impl CandidateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate observers of `entity`, replacing earlier ones.
    pub fn insert(&mut self, entity: EntityId, observers: HashSet<ConnectionId>) {
        self.candidates.insert(entity, observers);
    }

    /// Reports that `entity` should have no observers.
    pub fn insert_empty(&mut self, entity: EntityId) {
        self.candidates.insert(entity, HashSet::new());
    }

    /// Records a failure for `entity`; it is skipped for this rebuild.
    pub fn fail(&mut self, entity: EntityId, error: StrategyError) {
        self.candidates.remove(&entity);
        self.failures.push((entity, error));
    }

    pub fn get(&self, entity: EntityId) -> Option<&HashSet<ConnectionId>> {
        self.candidates.get(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.candidates.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn failures(&self) -> &[(EntityId, StrategyError)] {
        &self.failures
    }

    /// Splits the batch into candidates and failures.
    pub fn into_parts(self) -> (HashMap<EntityId, HashSet<ConnectionId>>, Vec<(EntityId, StrategyError)>) {
        (self.candidates, self.failures)
    }
}

/// Strategy bookkeeping exposed for monitoring and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    /// Non-empty partitions currently indexed
    pub partitions: usize,
    /// Partitions waiting for the next rebuild
    pub dirty_partitions: usize,
    /// Partitions recomputed since the last reset
    pub partitions_rebuilt: u64,
    /// Grid cells holding at least one connection
    pub occupied_cells: usize,
}

/// A visibility policy.
///
/// Exactly one strategy is active inside an [`crate::InterestEngine`]. The
/// lifecycle hooks keep the strategy's own indices in step with the world;
/// [`VisibilityStrategy::compute_candidates`] is called once per rebuild.
pub trait VisibilityStrategy: fmt::Debug + Send {
    /// Which policy this is.
    fn kind(&self) -> StrategyKind;

    /// Called after an entity joins the world.
    fn on_spawned(&mut self, _entity: &Entity) {}

    /// Called before an entity leaves the world.
    fn on_destroyed(&mut self, _entity: &Entity) {}

    /// Called after the host changed an entity through the engine.
    fn on_entity_changed(&mut self, _entity: &Entity) {}

    /// Called after the host changed a connection through the engine.
    fn on_connection_changed(&mut self, _previous: &Connection, _current: &Connection, _world: &World) {}

    /// Called when a connection joins or becomes eligible to observe.
    fn on_connection_joined(&mut self, _connection: &Connection, _world: &World) {}

    /// Per-tick bookkeeping. Returning `true` requests an immediate rebuild.
    fn on_tick(&mut self, _world: &World) -> bool {
        false
    }

    /// Produces candidate observers for this rebuild.
    fn compute_candidates(&mut self, world: &World, scope: RebuildScope) -> CandidateBatch;

    /// Single-pair predicate: should `connection` observe `entity` right now.
    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool;

    /// Drops every index, dirty set, grid and cache.
    fn reset_state(&mut self);

    fn stats(&self) -> StrategyStats {
        StrategyStats::default()
    }
}

/// Builds the strategy selected by `config`.
pub fn build_strategy(config: &InterestConfig) -> Box<dyn VisibilityStrategy> {
    match config.strategy {
        StrategyKind::Distance => Box::new(DistanceStrategy::new(config.visibility_radius)),
        StrategyKind::Scene => Box::new(SceneStrategy::new()),
        StrategyKind::Match => Box::new(MatchStrategy::new()),
        StrategyKind::SpatialHash => Box::new(SpatialHashStrategy::new(
            config.visibility_radius,
            config.check_method,
        )),
        StrategyKind::SceneDistance => Box::new(SceneDistanceStrategy::new(config.visibility_radius)),
    }
}

/// Fails `entity` if its position cannot be measured.
pub(crate) fn ensure_finite(entity: &Entity) -> Result<(), StrategyError> {
    if entity.position.is_finite() {
        Ok(())
    } else {
        Err(StrategyError::NonFinitePosition {
            entity: entity.id,
            position: entity.position,
        })
    }
}
