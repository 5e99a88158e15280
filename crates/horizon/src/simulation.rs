//! Deterministic simulated world for driving the interest engine.
//!
//! Players spawn on a ring and walk between waypoints on a fixed pattern;
//! props are scattered on a lattice. Every few ticks one prop hops to the
//! next scene so the scene strategies see partition changes, and on a slower
//! cycle one prop is destroyed and respawned while one player reconnects.

use crate::config::SimulationSettings;
use horizon_interest::{
    Connection, ConnectionId, Entity, EntityId, InterestEngine, MatchId, ReplicationSink, SceneId, Vec3, World,
};
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Counts replication transitions per connection.
#[derive(Debug, Default)]
pub struct ReplicationLog {
    pub shown: u64,
    pub hidden: u64,
    visible: HashMap<ConnectionId, i64>,
}

impl ReplicationLog {
    /// Entities currently replicated to `connection`.
    pub fn visible_to(&self, connection: ConnectionId) -> i64 {
        self.visible.get(&connection).copied().unwrap_or(0)
    }

    /// Drops the counters of a closed session.
    pub fn forget(&mut self, connection: ConnectionId) {
        self.visible.remove(&connection);
    }
}

impl ReplicationSink for ReplicationLog {
    fn show(&mut self, entity: EntityId, connection: ConnectionId) {
        trace!("spawn {} -> {}", entity, connection);
        self.shown += 1;
        *self.visible.entry(connection).or_default() += 1;
    }

    fn hide(&mut self, entity: EntityId, connection: ConnectionId) {
        trace!("despawn {} -> {}", entity, connection);
        self.hidden += 1;
        *self.visible.entry(connection).or_default() -= 1;
    }
}

#[derive(Debug, Clone)]
struct SimulatedPlayer {
    entity: EntityId,
    connection: ConnectionId,
    target: Vec3,
    /// Waypoints visited so far; picks the next one
    leg: u64,
}

/// World state plus the movement schedule.
#[derive(Debug)]
pub struct Simulation {
    settings: SimulationSettings,
    world: World,
    players: Vec<SimulatedPlayer>,
    props: Vec<EntityId>,
    scenes: Vec<SceneId>,
    tick: u64,
}

impl Simulation {
    /// Builds the world described by `settings`. Nothing is registered with
    /// an engine yet; see [`Simulation::spawn_all`].
    pub fn new(settings: SimulationSettings) -> Self {
        let scenes: Vec<SceneId> = (0..settings.scenes.max(1))
            .map(|i| SceneId::new(format!("scene-{i}")))
            .collect();
        let matches: Vec<MatchId> = (0..settings.matches.max(1)).map(|_| MatchId::new()).collect();

        let mut world = World::new();
        let mut players = Vec::with_capacity(settings.players);
        for (i, position) in spawn_positions(settings.players, settings.world_extent)
            .into_iter()
            .enumerate()
        {
            let entity = world.insert_entity(
                Entity::new(EntityId::new(), position)
                    .with_scene(scenes[i % scenes.len()].clone())
                    .with_match(matches[i % matches.len()]),
            );
            let connection = world.insert_connection(Connection::new(ConnectionId::new(), Some(entity)));
            players.push(SimulatedPlayer {
                entity,
                connection,
                target: position,
                leg: i as u64,
            });
        }

        let half = settings.world_extent / 2.0;
        let columns = (settings.props as f64).sqrt().ceil().max(1.0) as usize;
        let spacing = settings.world_extent / columns as f64;
        let mut props = Vec::with_capacity(settings.props);
        for i in 0..settings.props {
            let position = Vec3::new(
                -half + spacing * ((i % columns) as f64 + 0.5),
                0.0,
                -half + spacing * ((i / columns) as f64 + 0.5),
            );
            let mut entity = Entity::new(EntityId::new(), position).with_scene(scenes[i % scenes.len()].clone());
            // Every fifth prop stays out of all matches.
            if i % 5 != 0 {
                entity = entity.with_match(matches[i % matches.len()]);
            }
            props.push(world.insert_entity(entity));
        }

        debug!(
            "Simulated world: {} players, {} props, {} scenes, {} matches",
            players.len(),
            props.len(),
            scenes.len(),
            matches.len()
        );

        Self {
            settings,
            world,
            players,
            props,
            scenes,
            tick: 0,
        }
    }

    /// Registers every entity with `engine`, showing each one right away.
    pub fn spawn_all(&self, engine: &mut InterestEngine, sink: &mut dyn ReplicationSink) {
        for entity in self.world.entities.keys() {
            engine.on_spawned(&self.world, *entity, sink);
        }
    }

    /// Advances movement by one tick and reports changes to `engine`.
    pub fn step(&mut self, engine: &mut InterestEngine, log: &mut ReplicationLog) {
        self.tick += 1;
        let dt = self.settings.tick_seconds();
        let step = self.settings.player_speed * dt;
        let extent = self.settings.world_extent;

        for player in &mut self.players {
            let Some(entity) = self.world.entities.get_mut(&player.entity) else {
                continue;
            };
            if entity.position.distance(player.target) < 5.0 {
                player.leg += 1;
                player.target = waypoint(player.leg, extent);
            }
            entity.position = move_towards(entity.position, player.target, step);
        }

        let hop = self.settings.scene_hop_interval;
        if hop > 0 && self.tick % hop == 0 && !self.props.is_empty() {
            let index = ((self.tick / hop) as usize) % self.props.len();
            let prop = self.props[index];
            let scenes = &self.scenes;
            engine.update_entity(&mut self.world, prop, |entity| {
                let next = scenes
                    .iter()
                    .position(|scene| *scene == entity.scene)
                    .map(|current| (current + 1) % scenes.len())
                    .unwrap_or(0);
                entity.scene = scenes[next].clone();
            });
            trace!("prop {} hopped scene on tick {}", prop, self.tick);
        }

        let churn = self.settings.churn_interval;
        if churn > 0 && self.tick % churn == 0 {
            let round = (self.tick / churn) as usize;
            self.respawn_prop(round, engine, log);
            self.reconnect_player(round, engine, log);
        }
    }

    /// Destroys one prop and spawns a fresh entity in its place.
    fn respawn_prop(&mut self, round: usize, engine: &mut InterestEngine, log: &mut ReplicationLog) {
        if self.props.is_empty() {
            return;
        }
        let index = round % self.props.len();
        let Some(old) = self.world.remove_entity(self.props[index]) else {
            return;
        };

        for connection in engine.on_destroyed(&old) {
            log.hide(old.id, connection);
        }

        let replacement = self.world.insert_entity(Entity {
            id: EntityId::new(),
            ..old
        });
        self.props[index] = replacement;
        engine.on_spawned(&self.world, replacement, log);
        trace!("prop {} respawned as {} on tick {}", old.id, replacement, self.tick);
    }

    /// Closes one player's session and opens a new one for the same entity.
    fn reconnect_player(&mut self, round: usize, engine: &mut InterestEngine, log: &mut ReplicationLog) {
        if self.players.is_empty() {
            return;
        }
        let index = round % self.players.len();
        let (entity, old) = (self.players[index].entity, self.players[index].connection);

        self.world.remove_connection(old);
        let dropped = engine.on_disconnected(old);
        log.forget(old);

        let connection = self.world.insert_connection(Connection::new(ConnectionId::new(), Some(entity)));
        self.players[index].connection = connection;
        engine.on_connected(&self.world, connection, log);
        debug!(
            "player {} reconnected as {} ({} observer entries dropped)",
            entity, connection, dropped
        );
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Connections driving a player, in spawn order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(|player| player.connection)
    }
}

/// Spawn positions on a ring around the center.
fn spawn_positions(count: usize, world_extent: f64) -> Vec<Vec3> {
    let radius = world_extent / 4.0;
    (0..count)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / count as f64;
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
        })
        .collect()
}

/// Waypoint for the `leg`-th walk, spread over the world on a golden-angle spiral.
fn waypoint(leg: u64, world_extent: f64) -> Vec3 {
    let half = world_extent / 2.0;
    let angle = leg as f64 * 2.399_963;
    let radius = half * ((leg % 7) as f64 + 1.0) / 8.0;
    Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
}

fn move_towards(from: Vec3, to: Vec3, step: f64) -> Vec3 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let distance = (dx * dx + dz * dz).sqrt();
    if distance <= step || distance < 0.01 {
        return Vec3::new(to.x, from.y, to.z);
    }
    Vec3::new(from.x + dx / distance * step, from.y, from.z + dz / distance * step)
}
