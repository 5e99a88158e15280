//! Match partitioned visibility.

use super::partitioned::{admit_all, PartitionTracker};
use super::{CandidateBatch, RebuildScope, StrategyStats, VisibilityStrategy};
use crate::config::StrategyKind;
use crate::types::{Connection, Entity, MatchId, World};
use tracing::debug;

fn match_key(entity: &Entity) -> Option<MatchId> {
    entity.valid_match()
}

/// Every observing connection sees every entity in its player's match.
///
/// Unlike [`super::SceneStrategy`] there is no per-tick scan: match changes
/// arrive as events through [`VisibilityStrategy::on_entity_changed`] and
/// dirty the old and new match right away. Several events in one tick
/// coalesce, so each affected match is recomputed once on the next rebuild.
/// Entities without a match marker, or with [`MatchId::EMPTY`], are never
/// indexed and never observed.
#[derive(Debug, Clone, Default)]
pub struct MatchStrategy {
    tracker: PartitionTracker<MatchId>,
}

impl MatchStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of matches currently holding entities.
    pub fn match_count(&self) -> usize {
        self.tracker.index().partition_count()
    }

    pub fn is_dirty(&self, match_id: &MatchId) -> bool {
        self.tracker.index().is_dirty(match_id)
    }
}

impl VisibilityStrategy for MatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Match
    }

    fn on_spawned(&mut self, entity: &Entity) {
        self.tracker.sync(entity.id, match_key(entity));
    }

    fn on_destroyed(&mut self, entity: &Entity) {
        if let Some(match_id) = self.tracker.remove(entity.id) {
            debug!("entity {} destroyed, match {} marked dirty", entity.id, match_id);
        }
    }

    fn on_entity_changed(&mut self, entity: &Entity) {
        if !self.tracker.sync(entity.id, match_key(entity)) {
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

    fn compute_candidates(&mut self, world: &World, scope: RebuildScope) -> CandidateBatch {
        self.tracker.collect(world, scope, match_key, admit_all)
    }

    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        if entity.force_hidden {
            return false;
        }
        let Some(match_id) = entity.valid_match() else {
            return false;
        };
        world
            .observer_entity(connection)
            .and_then(Entity::valid_match)
            .map(|observer_match| observer_match == match_id)
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
