//! # Interest Engine
//!
//! The single authority over observer sets. The engine asks the active
//! [`VisibilityStrategy`] who should see what, diffs that against who sees
//! what now, and reports every transition to a [`ReplicationSink`].
//!
//! ## Rebuild phases
//!
//! 1. **Candidates**: the strategy produces candidate observers per entity.
//!    Candidates are then clipped to connections that may observe at all,
//!    and `force_hidden` entities are emptied.
//! 2. **Remove-old**: connections in an observer set but not in the
//!    candidates are hidden and dropped.
//! 3. **Add-new**: candidates not yet observing are shown and added.
//!
//! Only the engine writes observer sets; strategies only write candidates.

use crate::config::{InterestConfig, StrategyKind};
use crate::error::ConfigError;
use crate::strategies::{build_strategy, RebuildScope, StrategyStats, VisibilityStrategy};
use crate::types::{Connection, ConnectionId, Entity, EntityId, World};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A visibility transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisibilityEvent {
    /// `connection` starts observing `entity`
    Show { entity: EntityId, connection: ConnectionId },
    /// `connection` stops observing `entity`
    Hide { entity: EntityId, connection: ConnectionId },
}

/// Receives visibility transitions, typically to enqueue spawn and destroy
/// messages for the client.
///
/// The engine calls each method exactly once per transition.
pub trait ReplicationSink {
    fn show(&mut self, entity: EntityId, connection: ConnectionId);
    fn hide(&mut self, entity: EntityId, connection: ConnectionId);
}

/// Records transitions in order.
impl ReplicationSink for Vec<VisibilityEvent> {
    fn show(&mut self, entity: EntityId, connection: ConnectionId) {
        self.push(VisibilityEvent::Show { entity, connection });
    }

    fn hide(&mut self, entity: EntityId, connection: ConnectionId) {
        self.push(VisibilityEvent::Hide { entity, connection });
    }
}

/// Outcome of one rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Scope the strategy was asked for
    pub scope: RebuildScope,
    /// Entities whose observers were diffed
    pub entities_evaluated: usize,
    /// Show transitions emitted
    pub shown: usize,
    /// Hide transitions emitted
    pub hidden: usize,
    /// Entities skipped because the strategy failed on them
    pub failures: usize,
    /// Wall time of the rebuild in microseconds
    pub duration_us: u64,
}

/// Cumulative engine statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Rebuilds triggered by the interval or by the strategy
    pub tick_rebuilds: u64,
    /// Rebuilds requested on demand
    pub full_rebuilds: u64,
    /// Show transitions emitted
    pub total_shown: u64,
    /// Hide transitions emitted
    pub total_hidden: u64,
    /// Per-entity strategy failures
    pub total_failures: u64,
    /// Duration of the most recent rebuild in microseconds
    pub last_rebuild_us: u64,
    /// Entities with at least one observer
    pub observed_entities: usize,
    /// Entity/connection observer pairs
    pub observer_links: usize,
}

/// Decides which connections observe which entities.
///
/// # Examples
///
/// ```rust
/// use horizon_interest::{Connection, ConnectionId, Entity, EntityId, InterestConfig, InterestEngine, Vec3, VisibilityEvent, World};
///
/// let mut world = World::new();
/// let player = world.insert_entity(Entity::new(EntityId::new(), Vec3::zero()));
/// let connection = world.insert_connection(Connection::new(ConnectionId::new(), Some(player)));
/// let crate_id = world.insert_entity(Entity::new(EntityId::new(), Vec3::new(5.0, 0.0, 0.0)));
///
/// let mut engine = InterestEngine::from_config(InterestConfig::default())?;
/// let mut events: Vec<VisibilityEvent> = Vec::new();
/// engine.rebuild_all(&world, &mut events);
///
/// assert!(engine.is_observing(crate_id, connection));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct InterestEngine {
    config: InterestConfig,
    strategy: Box<dyn VisibilityStrategy>,
    /// Authoritative observer sets; empty sets are never stored
    observers: HashMap<EntityId, HashSet<ConnectionId>>,
    /// Connections that were eligible to observe at the last rebuild
    eligible: HashSet<ConnectionId>,
    /// Seconds since the last rebuild
    elapsed: f64,
    /// Next tick rebuild must cover the whole world
    full_rebuild_pending: bool,
    server_active: bool,
    stats: EngineStats,
}

impl InterestEngine {
    /// Creates an engine running `strategy`.
    pub fn new(config: InterestConfig, strategy: Box<dyn VisibilityStrategy>) -> Self {
        Self {
            config,
            strategy,
            observers: HashMap::new(),
            eligible: HashSet::new(),
            elapsed: 0.0,
            full_rebuild_pending: true,
            server_active: true,
            stats: EngineStats::default(),
        }
    }

    /// Validates `config` and creates an engine running the strategy it names.
    pub fn from_config(config: InterestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let strategy = build_strategy(&config);
        info!("Interest engine using {} strategy", strategy.kind());
        Ok(Self::new(config, strategy))
    }

    pub fn config(&self) -> &InterestConfig {
        &self.config
    }

    /// Enables or disables tick-driven rebuilds. Clients run the engine inactive.
    pub fn set_server_active(&mut self, active: bool) {
        self.server_active = active;
    }

    pub fn is_server_active(&self) -> bool {
        self.server_active
    }

    /// Advances the interval clock by `dt` seconds and rebuilds when due.
    ///
    /// Returns the report of the rebuild, if one ran.
    pub fn tick(&mut self, dt: f64, world: &World, sink: &mut dyn ReplicationSink) -> Option<RebuildReport> {
        if !self.server_active {
            return None;
        }

        let requested = self.strategy.on_tick(world);
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }

        if !requested && self.elapsed < self.config.update_interval_secs {
            return None;
        }
        self.elapsed = 0.0;

        let scope = if std::mem::take(&mut self.full_rebuild_pending) {
            RebuildScope::Full
        } else {
            RebuildScope::Dirty
        };
        self.stats.tick_rebuilds += 1;
        Some(self.rebuild(world, scope, sink))
    }

    /// Recomputes every observer set now, bypassing the interval.
    pub fn rebuild_all(&mut self, world: &World, sink: &mut dyn ReplicationSink) -> RebuildReport {
        self.full_rebuild_pending = false;
        self.stats.full_rebuilds += 1;
        self.rebuild(world, RebuildScope::Full, sink)
    }

    fn rebuild(&mut self, world: &World, scope: RebuildScope, sink: &mut dyn ReplicationSink) -> RebuildReport {
        let started = Instant::now();

        // Connections that became eligible without a join hook still need
        // their partitions recomputed.
        let eligible: HashSet<ConnectionId> = world.observers().map(|(connection, _)| connection.id).collect();
        let mut joined = 0usize;
        for (connection, _) in world.observers() {
            if !self.eligible.contains(&connection.id) {
                self.strategy.on_connection_joined(connection, world);
                joined += 1;
            }
        }
        if joined > 0 {
            debug!("{} connections became eligible since the last rebuild", joined);
        }

        // Phase 1: candidates, clipped to what the engine itself guarantees.
        let (mut candidates, failures) = self.strategy.compute_candidates(world, scope).into_parts();
        let failed: HashSet<EntityId> = failures.iter().map(|(entity, _)| *entity).collect();
        for (entity, error) in &failures {
            warn!("Skipping entity {} this rebuild: {}", entity, error);
        }

        // A failed entity gains nobody, but still loses ineligible observers below.
        candidates.retain(|entity_id, _| world.entities.contains_key(entity_id) && !failed.contains(entity_id));
        for (entity_id, set) in candidates.iter_mut() {
            match world.entities.get(entity_id) {
                Some(entity) if !entity.force_hidden => set.retain(|connection| eligible.contains(connection)),
                _ => set.clear(),
            }
        }

        let before = self.observers.len();
        self.observers.retain(|entity_id, _| world.entities.contains_key(entity_id));
        if self.observers.len() != before {
            debug!("Dropped observers of {} entities missing from the world", before - self.observers.len());
        }

        for (entity_id, current) in &self.observers {
            if candidates.contains_key(entity_id) {
                continue;
            }
            let force_hidden = world.entities.get(entity_id).map(|e| e.force_hidden).unwrap_or(true);
            if force_hidden {
                candidates.insert(*entity_id, HashSet::new());
            } else if current.iter().any(|connection| !eligible.contains(connection)) {
                candidates.insert(*entity_id, current.intersection(&eligible).copied().collect());
            }
        }

        // Phase 2: remove-old.
        let mut hidden = 0usize;
        for (entity_id, candidate) in &candidates {
            let Some(current) = self.observers.get_mut(entity_id) else {
                continue;
            };
            let stale: Vec<ConnectionId> = current.difference(candidate).copied().collect();
            for connection in stale {
                sink.hide(*entity_id, connection);
                hidden += 1;
            }
            current.retain(|connection| candidate.contains(connection));
        }

        // Phase 3: add-new.
        let mut shown = 0usize;
        for (entity_id, candidate) in &candidates {
            if candidate.is_empty() {
                continue;
            }
            let current = self.observers.entry(*entity_id).or_default();
            for connection in candidate {
                if !current.contains(connection) {
                    sink.show(*entity_id, *connection);
                    current.insert(*connection);
                    shown += 1;
                }
            }
        }

        self.observers.retain(|_, set| !set.is_empty());
        self.eligible = eligible;

        let duration_us = started.elapsed().as_micros() as u64;
        self.stats.total_shown += shown as u64;
        self.stats.total_hidden += hidden as u64;
        self.stats.total_failures += failures.len() as u64;
        self.stats.last_rebuild_us = duration_us;

        debug!(
            "{} rebuild ({:?}): {} entities evaluated, +{} / -{} observers, {} failures in {}us",
            self.strategy.kind(),
            scope,
            candidates.len(),
            shown,
            hidden,
            failures.len(),
            duration_us
        );

        RebuildReport {
            scope,
            entities_evaluated: candidates.len(),
            shown,
            hidden,
            failures: failures.len(),
            duration_us,
        }
    }

    /// Registers a newly spawned entity and shows it right away to every
    /// connection the strategy says should see it.
    ///
    /// Returns `false` if the entity is not in the world.
    pub fn on_spawned(&mut self, world: &World, entity_id: EntityId, sink: &mut dyn ReplicationSink) -> bool {
        let Some(entity) = world.entities.get(&entity_id) else {
            warn!("on_spawned for unknown entity {}", entity_id);
            return false;
        };
        self.strategy.on_spawned(entity);

        if !self.server_active || entity.force_hidden {
            return true;
        }

        let visible: Vec<ConnectionId> = world
            .observers()
            .filter(|(connection, _)| self.strategy.check_observer(entity, connection, world))
            .map(|(connection, _)| connection.id)
            .collect();

        if !visible.is_empty() {
            let current = self.observers.entry(entity_id).or_default();
            for connection in visible {
                if current.insert(connection) {
                    sink.show(entity_id, connection);
                    self.stats.total_shown += 1;
                }
            }
        }
        true
    }

    /// Unregisters a destroyed entity and returns the connections that were
    /// observing it.
    ///
    /// Affected partitions are only marked dirty; observers of other entities
    /// are recomputed on the next rebuild so several destroys can batch.
    pub fn on_destroyed(&mut self, entity: &Entity) -> HashSet<ConnectionId> {
        self.strategy.on_destroyed(entity);
        self.observers.remove(&entity.id).unwrap_or_default()
    }

    /// Registers a joining connection and shows it right away every entity
    /// the strategy says it should see.
    ///
    /// Returns `false` if the connection is not in the world.
    pub fn on_connected(&mut self, world: &World, connection_id: ConnectionId, sink: &mut dyn ReplicationSink) -> bool {
        let Some(connection) = world.connections.get(&connection_id) else {
            warn!("on_connected for unknown connection {}", connection_id);
            return false;
        };
        self.strategy.on_connection_joined(connection, world);

        if !self.server_active || world.observer_entity(connection).is_none() {
            return true;
        }

        let mut shown = 0u64;
        for entity in world.entities.values() {
            if entity.force_hidden || !self.strategy.check_observer(entity, connection, world) {
                continue;
            }
            if self.observers.entry(entity.id).or_default().insert(connection_id) {
                sink.show(entity.id, connection_id);
                shown += 1;
            }
        }
        self.stats.total_shown += shown;
        debug!("Connection {} joined observing {} entities", connection_id, shown);
        true
    }

    /// Forgets a disconnected connection without emitting hides.
    ///
    /// Returns how many observer sets it was removed from.
    pub fn on_disconnected(&mut self, connection: ConnectionId) -> usize {
        self.eligible.remove(&connection);
        let mut removed = 0;
        for set in self.observers.values_mut() {
            if set.remove(&connection) {
                removed += 1;
            }
        }
        self.observers.retain(|_, set| !set.is_empty());
        removed
    }

    /// Mutates an entity and notifies the strategy.
    ///
    /// Scene changes are also caught by the scene strategies' per-tick scan,
    /// but match, range and `force_hidden` changes must go through here.
    pub fn update_entity<F>(&mut self, world: &mut World, entity_id: EntityId, update: F) -> bool
    where
        F: FnOnce(&mut Entity),
    {
        let Some(entity) = world.entities.get_mut(&entity_id) else {
            return false;
        };
        update(entity);
        self.strategy.on_entity_changed(entity);
        true
    }

    /// Mutates a connection and notifies the strategy.
    pub fn update_connection<F>(&mut self, world: &mut World, connection_id: ConnectionId, update: F) -> bool
    where
        F: FnOnce(&mut Connection),
    {
        let Some(connection) = world.connections.get_mut(&connection_id) else {
            return false;
        };
        let previous = connection.clone();
        update(connection);
        let current = connection.clone();
        self.strategy.on_connection_changed(&previous, &current, world);
        true
    }

    /// Swaps the active strategy.
    ///
    /// Both strategies are reset, every live entity is registered with the new
    /// one, and the next tick rebuild covers the whole world. Observer sets are
    /// kept so that rebuild emits the transitions between the two policies.
    pub fn set_strategy(&mut self, strategy: Box<dyn VisibilityStrategy>, world: &World) {
        info!("Switching interest strategy {} -> {}", self.strategy.kind(), strategy.kind());
        self.strategy.reset_state();
        self.strategy = strategy;
        self.strategy.reset_state();
        for entity in world.entities.values() {
            self.strategy.on_spawned(entity);
        }
        self.config.strategy = self.strategy.kind();
        self.elapsed = 0.0;
        self.full_rebuild_pending = true;
    }

    /// Clears the strategy's indices and the interval clock.
    pub fn reset_state(&mut self) {
        self.strategy.reset_state();
        self.elapsed = 0.0;
        self.full_rebuild_pending = true;
    }

    /// Current observers of an entity.
    pub fn observers(&self, entity: EntityId) -> Option<&HashSet<ConnectionId>> {
        self.observers.get(&entity)
    }

    pub fn is_observing(&self, entity: EntityId, connection: ConnectionId) -> bool {
        self.observers
            .get(&entity)
            .map(|set| set.contains(&connection))
            .unwrap_or(false)
    }

    /// Entities a connection currently observes.
    pub fn observed_by(&self, connection: ConnectionId) -> Vec<EntityId> {
        self.observers
            .iter()
            .filter(|(_, set)| set.contains(&connection))
            .map(|(entity, _)| *entity)
            .collect()
    }

    /// The active strategy's single-pair predicate.
    pub fn check_observer(&self, entity: &Entity, connection: &Connection, world: &World) -> bool {
        self.strategy.check_observer(entity, connection, world)
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn strategy_stats(&self) -> StrategyStats {
        self.strategy.stats()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            observed_entities: self.observers.len(),
            observer_links: self.observers.values().map(HashSet::len).sum(),
            ..self.stats.clone()
        }
    }
}
