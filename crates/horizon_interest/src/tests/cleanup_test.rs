//! Spawn/destroy churn must leave no partition or observer state behind.

use crate::config::InterestConfig;
use crate::engine::{InterestEngine, VisibilityEvent};
use crate::strategies::{MatchStrategy, SceneDistanceStrategy, SceneStrategy, VisibilityStrategy};
use crate::types::{Connection, ConnectionId, Entity, EntityId, MatchId, Vec3, World};

const ENTITIES: usize = 1000;
const PARTITIONS: usize = 10;

fn churn(strategy: Box<dyn VisibilityStrategy>, build: impl Fn(usize) -> Entity) {
    let mut world = World::new();
    let mut engine = InterestEngine::new(InterestConfig::default(), strategy);
    let mut events: Vec<VisibilityEvent> = Vec::new();

    let ids: Vec<EntityId> = (0..ENTITIES).map(|i| world.insert_entity(build(i))).collect();
    // One observing connection per partition.
    for owned in ids.iter().take(PARTITIONS) {
        world.insert_connection(Connection::new(ConnectionId::new(), Some(*owned)));
    }
    for id in &ids {
        engine.on_spawned(&world, *id, &mut events);
    }

    engine.tick(1.0, &world, &mut events);
    assert_eq!(engine.strategy_stats().partitions, PARTITIONS);
    assert!(engine.stats().observer_links > 0);

    for id in ids {
        let entity = world.remove_entity(id).expect("spawned entity exists");
        engine.on_destroyed(&entity);
    }
    engine.tick(1.0, &world, &mut events);

    let stats = engine.strategy_stats();
    assert_eq!(stats.partitions, 0);
    assert_eq!(stats.dirty_partitions, 0);
    assert_eq!(engine.stats().observed_entities, 0);
    assert_eq!(engine.stats().observer_links, 0);
}

#[test]
fn test_scene_index_is_empty_after_churn() {
    churn(Box::new(SceneStrategy::new()), |i| {
        Entity::new(EntityId::new(), Vec3::zero()).with_scene(format!("scene-{}", i % PARTITIONS))
    });
}

#[test]
fn test_match_index_is_empty_after_churn() {
    let matches: Vec<MatchId> = (0..PARTITIONS).map(|_| MatchId::new()).collect();
    churn(Box::new(MatchStrategy::new()), |i| {
        Entity::new(EntityId::new(), Vec3::zero()).with_match(matches[i % PARTITIONS])
    });
}

#[test]
fn test_scene_distance_index_is_empty_after_churn() {
    churn(Box::new(SceneDistanceStrategy::new(30.0)), |i| {
        Entity::new(EntityId::new(), Vec3::new((i % 50) as f64, 0.0, 0.0))
            .with_scene(format!("scene-{}", i % PARTITIONS))
            .with_visibility_range(15.0)
    });
}
