//! # Horizon Interest Management
//!
//! Decides, for a server-authoritative simulation, which client connections
//! receive replication updates for which networked entities.
//!
//! ## Core Features
//!
//! - **Interchangeable policies**: distance, scene, match, spatial hash and a
//!   scene + distance hybrid behind one [`VisibilityStrategy`] trait
//! - **Consistent transitions**: every rebuild diffs fresh candidates against
//!   the current observer sets and emits each show/hide exactly once
//! - **Bounded cost**: rebuilds are throttled by an update interval, and the
//!   partitioned strategies only recompute partitions that changed
//! - **No hidden state**: entities and connections are handed in as an
//!   explicit [`World`], so the engine is driven and tested with plain data
//!
//! ## Architecture Overview
//!
//! ```text
//! host loop ──tick(dt)──▶ InterestEngine ──compute_candidates──▶ VisibilityStrategy
//!                              │                                   ├─ PartitionIndex
//!                              │                                   └─ SpatialGrid
//!                              └──show / hide──▶ ReplicationSink
//! ```
//!
//! ## Quick Start Example
//!
//! ```rust
//! use horizon_interest::*;
//!
//! let mut world = World::new();
//! let player = world.insert_entity(Entity::new(EntityId::new(), Vec3::zero()).with_scene("lobby"));
//! let connection = world.insert_connection(Connection::new(ConnectionId::new(), Some(player)));
//!
//! let config = InterestConfig::default().with_strategy(StrategyKind::Scene);
//! let mut engine = InterestEngine::from_config(config)?;
//! let mut events: Vec<VisibilityEvent> = Vec::new();
//!
//! let door = world.insert_entity(Entity::new(EntityId::new(), Vec3::new(3.0, 0.0, 1.0)).with_scene("lobby"));
//! engine.on_spawned(&world, player, &mut events);
//! engine.on_spawned(&world, door, &mut events);
//!
//! // One server frame at 20 Hz; rebuilds run once per update interval.
//! engine.tick(0.05, &world, &mut events);
//! assert!(engine.is_observing(door, connection));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod spatial;
pub mod strategies;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{CheckMethod, InterestConfig, StrategyKind};
pub use engine::{EngineStats, InterestEngine, RebuildReport, ReplicationSink, VisibilityEvent};
pub use error::{ConfigError, StrategyError};
pub use spatial::{CellKey, PartitionIndex, SpatialGrid};
pub use strategies::{
    build_strategy, CandidateBatch, DistanceStrategy, MatchStrategy, RebuildScope, SceneDistanceStrategy,
    SceneStrategy, SpatialHashStrategy, StrategyStats, VisibilityStrategy,
};
pub use types::{Connection, ConnectionId, Entity, EntityId, MatchId, SceneId, Vec3, World};
