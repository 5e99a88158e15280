use super::fixtures::{
    assert_observers_match_predicate, hides, observers_of, shows, spawn_player, spawn_player_in_scene, spawn_prop,
    spawn_prop_in_scene,
};
use crate::config::{InterestConfig, StrategyKind};
use crate::engine::{InterestEngine, VisibilityEvent};
use crate::strategies::{RebuildScope, SceneDistanceStrategy, SceneStrategy};
use crate::types::{Entity, EntityId, SceneId, Vec3, World};

fn distance_engine(interval: f64) -> InterestEngine {
    let config = InterestConfig::default()
        .with_strategy(StrategyKind::Distance)
        .with_update_interval(interval)
        .with_visibility_radius(30.0);
    InterestEngine::from_config(config).expect("test config is valid")
}

#[test]
fn test_from_config_rejects_invalid_settings() {
    assert!(InterestEngine::from_config(InterestConfig::default().with_update_interval(-1.0)).is_err());
    assert!(InterestEngine::from_config(InterestConfig::default().with_visibility_radius(0.0)).is_err());

    let engine = InterestEngine::from_config(InterestConfig::default().with_strategy(StrategyKind::Match))
        .expect("default config is valid");
    assert_eq!(engine.strategy_kind(), StrategyKind::Match);
}

#[test]
fn test_tick_waits_for_interval() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let prop = spawn_prop(&mut world, Vec3::new(3.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();

    assert!(engine.tick(0.5, &world, &mut events).is_none());
    assert!(!engine.is_observing(prop, connection));

    let report = engine.tick(0.5, &world, &mut events).expect("interval elapsed");
    assert_eq!(report.scope, RebuildScope::Full);
    assert!(engine.is_observing(prop, connection));

    // The clock restarts after every rebuild.
    assert!(engine.tick(0.9, &world, &mut events).is_none());
    let report = engine.tick(0.2, &world, &mut events).expect("interval elapsed");
    assert_eq!(report.scope, RebuildScope::Dirty);
    assert_eq!(engine.stats().tick_rebuilds, 2);
}

#[test]
fn test_tick_ignores_invalid_dt() {
    let world = World::new();
    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();

    assert!(engine.tick(f64::NAN, &world, &mut events).is_none());
    assert!(engine.tick(-5.0, &world, &mut events).is_none());
    assert!(engine.tick(f64::INFINITY, &world, &mut events).is_none());
    assert!(engine.tick(1.0, &world, &mut events).is_some());
}

#[test]
fn test_inactive_engine_does_nothing() {
    let mut world = World::new();
    spawn_player(&mut world, Vec3::zero());
    let prop = spawn_prop(&mut world, Vec3::new(1.0, 0.0, 0.0));

    let mut engine = distance_engine(0.1);
    engine.set_server_active(false);
    let mut events = Vec::new();

    assert!(engine.on_spawned(&world, prop, &mut events));
    assert!(engine.tick(10.0, &world, &mut events).is_none());
    assert!(events.is_empty());
    assert_eq!(engine.stats().observer_links, 0);

    engine.set_server_active(true);
    assert!(engine.tick(0.1, &world, &mut events).is_some());
    assert!(!events.is_empty());
}

#[test]
fn test_on_spawned_shows_immediately() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let near = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));
    let far = spawn_prop(&mut world, Vec3::new(200.0, 0.0, 0.0));

    let mut engine = distance_engine(10.0);
    let mut events = Vec::new();
    assert!(engine.on_spawned(&world, near, &mut events));
    assert!(engine.on_spawned(&world, far, &mut events));

    assert_eq!(
        events,
        vec![VisibilityEvent::Show {
            entity: near,
            connection
        }]
    );
    assert!(!engine.on_spawned(&world, EntityId::new(), &mut events));
}

#[test]
fn test_force_hidden_entities_have_no_observers() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let prop = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(prop, connection));

    events.clear();
    engine.update_entity(&mut world, prop, |entity| entity.force_hidden = true);
    engine.rebuild_all(&world, &mut events);
    assert_eq!(events, vec![VisibilityEvent::Hide { entity: prop, connection }]);
    assert!(engine.observers(prop).is_none());

    let hidden_spawn =
        world.insert_entity(Entity::new(EntityId::new(), Vec3::new(1.0, 0.0, 0.0)).with_force_hidden(true));
    events.clear();
    engine.on_spawned(&world, hidden_spawn, &mut events);
    assert!(events.is_empty());
}

#[test]
fn test_failed_entity_keeps_observers_and_others_proceed() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let broken = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));
    let leaving = spawn_prop(&mut world, Vec3::new(4.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);

    engine.update_entity(&mut world, broken, |entity| entity.position = Vec3::new(f64::NAN, 0.0, 0.0));
    engine.update_entity(&mut world, leaving, |entity| entity.position = Vec3::new(400.0, 0.0, 0.0));

    events.clear();
    let report = engine.rebuild_all(&world, &mut events);
    assert_eq!(report.failures, 1);
    assert_eq!(events, vec![VisibilityEvent::Hide { entity: leaving, connection }]);
    assert!(engine.is_observing(broken, connection));
    assert_eq!(engine.stats().total_failures, 1);

    // Recovers once the position is measurable again.
    engine.update_entity(&mut world, broken, |entity| entity.position = Vec3::new(500.0, 0.0, 0.0));
    events.clear();
    engine.rebuild_all(&world, &mut events);
    assert_eq!(events, vec![VisibilityEvent::Hide { entity: broken, connection }]);
}

#[test]
fn test_failed_entity_still_drops_ineligible_observers() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let (_, steady) = spawn_player(&mut world, Vec3::new(1.0, 0.0, 0.0));
    let broken = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(broken, connection));

    engine.update_entity(&mut world, broken, |entity| entity.position = Vec3::new(f64::NAN, 0.0, 0.0));
    engine.update_connection(&mut world, connection, |c| c.ready = false);

    events.clear();
    let report = engine.rebuild_all(&world, &mut events);
    assert_eq!(report.failures, 1);
    assert!(events.contains(&VisibilityEvent::Hide { entity: broken, connection }));
    assert!(!engine.is_observing(broken, connection));
    assert!(engine.is_observing(broken, steady));
}

#[test]
fn test_connection_must_be_ready_and_authenticated() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    let prop = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(prop, connection));

    engine.update_connection(&mut world, connection, |c| c.ready = false);
    events.clear();
    engine.rebuild_all(&world, &mut events);
    assert_eq!(hides(&events), 2);
    assert!(engine.observed_by(connection).is_empty());
    assert_observers_match_predicate(&engine, &world);

    engine.update_connection(&mut world, connection, |c| c.ready = true);
    engine.update_connection(&mut world, connection, |c| c.authenticated = false);
    events.clear();
    engine.rebuild_all(&world, &mut events);
    assert!(events.is_empty());

    engine.update_connection(&mut world, connection, |c| c.authenticated = true);
    engine.rebuild_all(&world, &mut events);
    assert_eq!(shows(&events), 2);
}

#[test]
fn test_unready_connection_hidden_under_partitioned_strategy() {
    let mut world = World::new();
    let (_, connection) = spawn_player_in_scene(&mut world, Vec3::zero(), "hall");
    let prop = spawn_prop_in_scene(&mut world, Vec3::zero(), "hall");

    let mut engine = InterestEngine::new(InterestConfig::default(), Box::new(SceneStrategy::new()));
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(prop, connection));

    // Flipped behind the engine's back: no strategy hook fires.
    if let Some(c) = world.connections.get_mut(&connection) {
        c.ready = false;
    }
    events.clear();
    engine.tick(1.0, &world, &mut events);
    assert!(!engine.is_observing(prop, connection));
    assert_eq!(hides(&events), 2);
}

#[test]
fn test_on_destroyed_returns_former_observers() {
    let mut world = World::new();
    let (_, first) = spawn_player(&mut world, Vec3::zero());
    let (_, second) = spawn_player(&mut world, Vec3::new(1.0, 0.0, 0.0));
    let prop = spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);

    let entity = world.remove_entity(prop).expect("prop exists");
    let former = engine.on_destroyed(&entity);
    assert_eq!(former.len(), 2);
    assert!(former.contains(&first) && former.contains(&second));
    assert!(engine.observers(prop).is_none());

    events.clear();
    engine.rebuild_all(&world, &mut events);
    assert!(events.is_empty());
}

#[test]
fn test_on_disconnected_strips_connection_silently() {
    let mut world = World::new();
    let (player, connection) = spawn_player(&mut world, Vec3::zero());
    let (_, other) = spawn_player(&mut world, Vec3::new(1.0, 0.0, 0.0));
    spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert_eq!(engine.observed_by(connection).len(), 3);

    world.remove_connection(connection);
    assert_eq!(engine.on_disconnected(connection), 3);
    assert!(engine.observed_by(connection).is_empty());
    assert!(engine.is_observing(player, other));

    events.clear();
    engine.rebuild_all(&world, &mut events);
    assert!(events.is_empty());
    assert_eq!(engine.on_disconnected(connection), 0);
}

#[test]
fn test_set_strategy_rebuilds_fully_and_emits_differences() {
    let mut world = World::new();
    let (_, connection) = spawn_player_in_scene(&mut world, Vec3::zero(), "hall");
    let same_scene_far = spawn_prop_in_scene(&mut world, Vec3::new(500.0, 0.0, 0.0), "hall");
    let other_scene_near = spawn_prop_in_scene(&mut world, Vec3::new(1.0, 0.0, 0.0), "vault");

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(other_scene_near, connection));
    assert!(!engine.is_observing(same_scene_far, connection));

    engine.set_strategy(Box::new(SceneStrategy::new()), &world);
    assert_eq!(engine.strategy_kind(), StrategyKind::Scene);
    assert_eq!(engine.config().strategy, StrategyKind::Scene);

    events.clear();
    assert!(engine.tick(0.5, &world, &mut events).is_none());
    let report = engine.tick(0.5, &world, &mut events).expect("interval elapsed");
    assert_eq!(report.scope, RebuildScope::Full);
    assert!(events.contains(&VisibilityEvent::Hide {
        entity: other_scene_near,
        connection
    }));
    assert!(events.contains(&VisibilityEvent::Show {
        entity: same_scene_far,
        connection
    }));
    assert_observers_match_predicate(&engine, &world);
}

#[test]
fn test_reset_state_forces_full_rebuild() {
    let mut world = World::new();
    let (_, connection) = spawn_player_in_scene(&mut world, Vec3::zero(), "hall");
    let prop = spawn_prop_in_scene(&mut world, Vec3::zero(), "hall");

    let mut engine = InterestEngine::new(InterestConfig::default(), Box::new(SceneStrategy::new()));
    let mut events = Vec::new();
    engine.tick(1.0, &world, &mut events);
    assert!(engine.is_observing(prop, connection));

    engine.reset_state();
    assert_eq!(engine.strategy_stats().partitions, 0);

    events.clear();
    let report = engine.tick(1.0, &world, &mut events).expect("interval elapsed");
    assert_eq!(report.scope, RebuildScope::Full);
    assert!(events.is_empty());
    assert_eq!(engine.strategy_stats().partitions, 1);
}

#[test]
fn test_scene_distance_rebuilds_on_next_tick_after_scene_change() {
    let mut world = World::new();
    let (_, connection) = spawn_player_in_scene(&mut world, Vec3::zero(), "A");
    let mover = spawn_prop_in_scene(&mut world, Vec3::new(1.0, 0.0, 0.0), "A");

    let config = InterestConfig::default().with_update_interval(60.0);
    let mut engine = InterestEngine::new(config, Box::new(SceneDistanceStrategy::new(30.0)));
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);
    assert!(engine.is_observing(mover, connection));

    assert!(engine.tick(0.01, &world, &mut events).is_none());

    if let Some(entity) = world.entities.get_mut(&mover) {
        entity.scene = SceneId::from("B");
    }
    events.clear();
    assert!(engine.tick(0.01, &world, &mut events).is_some());
    assert_eq!(events, vec![VisibilityEvent::Hide { entity: mover, connection }]);
}

#[test]
fn test_stats_track_links_and_transitions() {
    let mut world = World::new();
    let (_, connection) = spawn_player(&mut world, Vec3::zero());
    spawn_prop(&mut world, Vec3::new(1.0, 0.0, 0.0));
    spawn_prop(&mut world, Vec3::new(2.0, 0.0, 0.0));

    let mut engine = distance_engine(1.0);
    let mut events = Vec::new();
    engine.rebuild_all(&world, &mut events);

    let stats = engine.stats();
    assert_eq!(stats.full_rebuilds, 1);
    assert_eq!(stats.total_shown, 3);
    assert_eq!(stats.observed_entities, 3);
    assert_eq!(stats.observer_links, 3);
    assert_eq!(observers_of(&engine, world.connections[&connection].owned_entity.expect("owned")).len(), 1);
}
