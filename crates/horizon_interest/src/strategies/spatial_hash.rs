//! Grid-based visibility.

use super::{CandidateBatch, RebuildScope, StrategyStats, VisibilityStrategy};
use crate::config::{CheckMethod, StrategyKind};
use crate::error::StrategyError;
use crate::spatial::{CellKey, SpatialGrid};
use crate::types::{Connection, ConnectionId, Entity, World};
use std::collections::HashSet;
use tracing::trace;

/// Cells per visibility radius; a 3x3 block of such cells spans the radius.
const CELLS_PER_RADIUS: f64 = 3.0;

/// Hashes observing connections into a 2D grid and shows each entity to the
/// connections in its cell and the eight surrounding cells.
///
/// The visible region is a square of roughly `visibility_radius` around the
/// entity's cell rather than an exact circle; in exchange a rebuild costs
/// O(entities + connections).
#[derive(Debug, Clone)]
pub struct SpatialHashStrategy {
    visibility_radius: f64,
    check_method: CheckMethod,
    grid: SpatialGrid<ConnectionId>,
}

impl SpatialHashStrategy {
    pub fn new(visibility_radius: f64, check_method: CheckMethod) -> Self {
        Self {
            visibility_radius,
            check_method,
            grid: SpatialGrid::new(),
        }
    }

    /// Edge length of one grid cell.
    pub fn cell_size(&self) -> f64 {
        self.visibility_radius / CELLS_PER_RADIUS
    }

    pub fn check_method(&self) -> CheckMethod {
        self.check_method
    }

    fn cell_of(&self, entity: &Entity) -> Result<CellKey, StrategyError> {
        if !entity.position.is_finite() {
            return Err(StrategyError::NonFinitePosition {
                entity: entity.id,
                position: entity.position,
            });
        }
        CellKey::from_position(entity.position, self.cell_size(), self.check_method).ok_or(
            StrategyError::OutOfGrid {
                entity: entity.id,
                position: entity.position,
            },
        )
    }

    /// Clears the grid and re-inserts every observing connection.
    fn repopulate(&mut self, world: &World) {
        self.grid.clear();
        for (connection, owned) in world.observers() {
            match self.cell_of(owned) {
                Ok(cell) => self.grid.add(cell, connection.id),
                Err(error) => trace!("connection {} left out of grid: {}", connection.id, error),
            }
        }
    }
}

impl VisibilityStrategy for SpatialHashStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SpatialHash
    }

    fn compute_candidates(&mut self, world: &World, _scope: RebuildScope) -> CandidateBatch {
        self.repopulate(world);

        let mut batch = CandidateBatch::new();
        for entity in world.entities.values() {
            if entity.force_hidden {
                batch.insert_empty(entity.id);
                continue;
            }
            match self.cell_of(entity) {
                Ok(cell) => {
                    let mut visible = HashSet::new();
                    self.grid.get_with_neighbors(cell, &mut visible);
                    batch.insert(entity.id, visible);
                }
                Err(error) => batch.fail(entity.id, error),
            }
        }
        batch
    }

    fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        if entity.force_hidden {
            return false;
        }
        let Some(owned) = world.observer_entity(connection) else {
            return false;
        };
        match (self.cell_of(entity), self.cell_of(owned)) {
            (Ok(a), Ok(b)) => (i64::from(a.x) - i64::from(b.x)).abs() <= 1 && (i64::from(a.y) - i64::from(b.y)).abs() <= 1,
            _ => false,
        }
    }

    fn reset_state(&mut self) {
        self.grid.reset();
    }

    fn stats(&self) -> StrategyStats {
        StrategyStats {
            occupied_cells: self.grid.occupied_cells(),
            ..StrategyStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{spawn_player, spawn_prop};
    use crate::types::Vec3;

    #[test]
    fn test_cell_size_is_third_of_radius() {
        let strategy = SpatialHashStrategy::new(30.0, CheckMethod::Xz);
        assert_eq!(strategy.cell_size(), 10.0);
    }

    #[test]
    fn test_neighborhood_visibility_xz() {
        let mut world = World::new();
        let (_, connection) = spawn_player(&mut world, Vec3::new(5.0, 0.0, 5.0));
        let neighbor = spawn_prop(&mut world, Vec3::new(15.0, 500.0, -5.0));
        let distant = spawn_prop(&mut world, Vec3::new(25.0, 0.0, 5.0));

        let mut strategy = SpatialHashStrategy::new(30.0, CheckMethod::Xz);
        let batch = strategy.compute_candidates(&world, RebuildScope::Dirty);

        // Height is ignored on the ground plane.
        assert!(batch.get(neighbor).is_some_and(|set| set.contains(&connection)));
        assert!(batch.get(distant).is_some_and(|set| set.is_empty()));
        assert_eq!(strategy.stats().occupied_cells, 1);
    }

    #[test]
    fn test_xy_projection_ignores_z() {
        let mut world = World::new();
        let (_, connection) = spawn_player(&mut world, Vec3::new(0.0, 0.0, 0.0));
        let far_in_z = spawn_prop(&mut world, Vec3::new(1.0, 1.0, 9000.0));

        let mut strategy = SpatialHashStrategy::new(30.0, CheckMethod::Xy);
        let batch = strategy.compute_candidates(&world, RebuildScope::Dirty);
        assert!(batch.get(far_in_z).is_some_and(|set| set.contains(&connection)));
    }

    #[test]
    fn test_grid_follows_moving_connections() {
        let mut world = World::new();
        let (player, connection) = spawn_player(&mut world, Vec3::zero());
        let prop = spawn_prop(&mut world, Vec3::zero());

        let mut strategy = SpatialHashStrategy::new(30.0, CheckMethod::Xz);
        let batch = strategy.compute_candidates(&world, RebuildScope::Dirty);
        assert!(batch.get(prop).is_some_and(|set| set.contains(&connection)));

        if let Some(entity) = world.entities.get_mut(&player) {
            entity.position = Vec3::new(1000.0, 0.0, 1000.0);
        }
        let batch = strategy.compute_candidates(&world, RebuildScope::Dirty);
        assert!(batch.get(prop).is_some_and(|set| set.is_empty()));
        assert_eq!(strategy.stats().occupied_cells, 1);
    }

    #[test]
    fn test_out_of_grid_entity_fails() {
        let mut world = World::new();
        spawn_player(&mut world, Vec3::zero());
        let huge = spawn_prop(&mut world, Vec3::new(1.0e300, 0.0, 0.0));

        let mut strategy = SpatialHashStrategy::new(30.0, CheckMethod::Xz);
        let batch = strategy.compute_candidates(&world, RebuildScope::Dirty);
        assert!(matches!(
            batch.failures(),
            [(id, StrategyError::OutOfGrid { .. })] if *id == huge
        ));
    }
}
