//! Brute-force distance visibility.

use super::{ensure_finite, CandidateBatch, RebuildScope, VisibilityStrategy};
use crate::config::StrategyKind;
use crate::types::{Connection, ConnectionId, Entity, Vec3, World};
use std::collections::HashSet;

/// Shows an entity to every connection whose player is within range.
///
/// The range is the entity's own override when it has one, else the default
/// radius. The boundary is inclusive: a connection exactly `range` away
/// observes. Every rebuild compares every entity with every connection, so
/// this is meant for small worlds.
#[derive(Debug, Clone)]
pub struct DistanceStrategy {
    default_range: f64,
}

impl DistanceStrategy {
    pub fn new(default_range: f64) -> Self {
        Self { default_range }
    }

    pub fn default_range(&self) -> f64 {
        self.default_range
    }

    fn range_of(&self, entity: &Entity) -> f64 {
        entity.visibility_range.unwrap_or(self.default_range)
    }

    fn in_range(&self, entity: &Entity, observer_position: Vec3) -> bool {
        let range = self.range_of(entity);
        entity.position.distance_squared(observer_position) <= range * range
    }
}

impl VisibilityStrategy for DistanceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Distance
    }

    fn compute_candidates(&mut self, world: &World, _scope: RebuildScope) -> CandidateBatch {
        let observers: Vec<(ConnectionId, Vec3)> = world
            .observers()
            .filter(|(_, owned)| owned.position.is_finite())
            .map(|(connection, owned)| (connection.id, owned.position))
            .collect();

        let mut batch = CandidateBatch::new();
        for entity in world.entities.values() {
            if entity.force_hidden {
                batch.insert_empty(entity.id);
                continue;
            }
            if let Err(error) = ensure_finite(entity) {
                batch.fail(entity.id, error);
                continue;
            }

            let visible: HashSet<ConnectionId> = observers
                .iter()
                .filter(|(_, position)| self.in_range(entity, *position))
                .map(|(connection_id, _)| *connection_id)
                .collect();
            batch.insert(entity.id, visible);
        }
        batch
    }

    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        if entity.force_hidden {
            return false;
        }
        world
            .observer_entity(connection)
            .map(|owned| self.in_range(entity, owned.position))
            .unwrap_or(false)
    }

    fn reset_state(&mut self) {}
}
