//! Scene pre-filter combined with a distance check.

use super::partitioned::{admit_within, PartitionTracker};
use super::{CandidateBatch, RebuildScope, StrategyStats, VisibilityStrategy};
use crate::config::StrategyKind;
use crate::types::{Connection, Entity, EntityId, SceneId, World};
use std::collections::HashMap;
use tracing::debug;

fn scene_key(entity: &Entity) -> Option<SceneId> {
    entity.scene.is_valid().then(|| entity.scene.clone())
}

/// Shows an entity to connections whose player shares its scene and is
/// strictly closer than the entity's range.
///
/// Range overrides are cached in a side table when the entity spawns, so a
/// rebuild does not consult entity attributes. Every rebuild covers the whole
/// world; it runs on the regular interval, or on the very next tick when the
/// per-tick scan sees an entity change scene.
#[derive(Debug, Clone)]
pub struct SceneDistanceStrategy {
    default_range: f64,
    tracker: PartitionTracker<SceneId>,
    /// Range overrides captured at spawn
    ranges: HashMap<EntityId, f64>,
}

impl SceneDistanceStrategy {
    pub fn new(default_range: f64) -> Self {
        Self {
            default_range,
            tracker: PartitionTracker::default(),
            ranges: HashMap::new(),
        }
    }

    /// Effective range of an entity: cached override, else the default.
    pub fn range_of(&self, entity: EntityId) -> f64 {
        range_from(&self.ranges, entity, self.default_range)
    }

    /// Number of cached range overrides.
    pub fn cached_ranges(&self) -> usize {
        self.ranges.len()
    }

    fn cache_range(&mut self, entity: &Entity) {
        match entity.visibility_range {
            Some(range) => {
                self.ranges.insert(entity.id, range);
            }
            None => {
                self.ranges.remove(&entity.id);
            }
        }
    }
}

fn range_from(ranges: &HashMap<EntityId, f64>, entity: EntityId, default_range: f64) -> f64 {
    ranges.get(&entity).copied().unwrap_or(default_range)
}

impl VisibilityStrategy for SceneDistanceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SceneDistance
    }

    fn on_spawned(&mut self, entity: &Entity) {
        self.cache_range(entity);
        self.tracker.sync(entity.id, scene_key(entity));
    }

    fn on_destroyed(&mut self, entity: &Entity) {
        self.ranges.remove(&entity.id);
        self.tracker.remove(entity.id);
    }

    fn on_entity_changed(&mut self, entity: &Entity) {
        self.cache_range(entity);
        self.tracker.sync(entity.id, scene_key(entity));
    }

    fn on_tick(&mut self, world: &World) -> bool {
        let mut moved = 0usize;
        for entity in world.entities.values() {
            if self.tracker.sync(entity.id, scene_key(entity)) {
                moved += 1;
            }
        }
        if moved > 0 {
            debug!("scene scan: {} entities changed scene, requesting rebuild", moved);
        }
        moved > 0
    }

    fn compute_candidates(&mut self, world: &World, _scope: RebuildScope) -> CandidateBatch {
        let ranges = &self.ranges;
        let default_range = self.default_range;
        self.tracker.collect(world, RebuildScope::Full, scene_key, |entity, observer| {
            admit_within(entity, observer, range_from(ranges, entity.id, default_range))
        })
    }

    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        if entity.force_hidden || !entity.scene.is_valid() {
            return false;
        }
        let Some(owned) = world.observer_entity(connection) else {
            return false;
        };
        owned.scene == entity.scene
            && admit_within(entity, owned, self.range_of(entity.id)).unwrap_or(false)
    }

    fn reset_state(&mut self) {
        self.tracker.clear();
        self.ranges.clear();
    }

    fn stats(&self) -> StrategyStats {
        StrategyStats {
            partitions: self.tracker.index().partition_count(),
            dirty_partitions: self.tracker.index().dirty_count(),
            partitions_rebuilt: self.tracker.partitions_rebuilt(),
            occupied_cells: 0,
        }
    }
}
