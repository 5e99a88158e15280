//! Scene (room) partitioned visibility.

use super::partitioned::{admit_all, PartitionTracker};
use super::{CandidateBatch, RebuildScope, StrategyStats, VisibilityStrategy};
use crate::config::StrategyKind;
use crate::types::{Connection, Entity, SceneId, World};
use tracing::debug;

fn scene_key(entity: &Entity) -> Option<SceneId> {
    entity.scene.is_valid().then(|| entity.scene.clone())
}

/// Every observing connection sees every entity in its player's scene.
///
/// Scene changes are picked up by a per-tick scan that compares each
/// entity's scene with the last one recorded. A change dirties the old and
/// new scene; interval rebuilds only recompute dirty scenes.
#[derive(Debug, Clone, Default)]
pub struct SceneStrategy {
    tracker: PartitionTracker<SceneId>,
}

impl SceneStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scenes currently holding entities.
    pub fn scene_count(&self) -> usize {
        self.tracker.index().partition_count()
    }

    pub fn is_dirty(&self, scene: &SceneId) -> bool {
        self.tracker.index().is_dirty(scene)
    }
}

impl VisibilityStrategy for SceneStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scene
    }

    fn on_spawned(&mut self, entity: &Entity) {
        self.tracker.sync(entity.id, scene_key(entity));
    }

    fn on_destroyed(&mut self, entity: &Entity) {
        self.tracker.remove(entity.id);
    }

    fn on_entity_changed(&mut self, entity: &Entity) {
        if !self.tracker.sync(entity.id, scene_key(entity)) {
            self.tracker.touch(entity.id);
        }
    }

    fn on_connection_changed(&mut self, previous: &Connection, current: &Connection, _world: &World) {
        self.tracker.touch_connection(previous, current);
    }

    fn on_connection_joined(&mut self, connection: &Connection, _world: &World) {
        if let Some(owned) = connection.owned_entity {
            self.tracker.touch(owned);
        }
    }

    fn on_tick(&mut self, world: &World) -> bool {
        let mut moved = 0usize;
        for entity in world.entities.values() {
            if self.tracker.sync(entity.id, scene_key(entity)) {
                moved += 1;
            }
        }
        if moved > 0 {
            debug!("scene scan: {} entities changed scene", moved);
        }
        false
    }

    fn compute_candidates(&mut self, world: &World, scope: RebuildScope) -> CandidateBatch {
        self.tracker.collect(world, scope, scene_key, admit_all)
    }

    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        if entity.force_hidden || !entity.scene.is_valid() {
            return false;
        }
        world
            .observer_entity(connection)
            .map(|owned| owned.scene == entity.scene)
            .unwrap_or(false)
    }

    fn reset_state(&mut self) {
        self.tracker.clear();
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
