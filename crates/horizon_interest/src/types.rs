//! # Core Type Definitions
//!
//! The identifiers, entity/connection records and the world tables that every
//! interest strategy reads from.
//!
//! ## Key Types
//!
//! - [`EntityId`] - Unique identifier for a replicated entity
//! - [`ConnectionId`] - Unique identifier for a client connection
//! - [`Vec3`] - 3D position with double precision
//! - [`SceneId`] / [`MatchId`] - Partition keys used by the partitioned strategies
//! - [`World`] - Explicit entity and connection tables passed into the engine
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (EntityId vs ConnectionId)
//! - **No hidden state**: The engine never reaches into global registries; the
//!   host hands it a [`World`] on every call
//! - **Serialization**: Identifiers and records support serde for config and diagnostics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a networked entity.
///
/// # Examples
///
/// ```rust
/// use horizon_interest::EntityId;
///
/// let entity_id = EntityId::new();
/// let parsed: EntityId = entity_id.to_string().parse()?;
/// assert_eq!(entity_id, parsed);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Creates a new random entity ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Creates a new random connection ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a 3D position in the game world.
///
/// Strategies that hash positions into a grid project this onto two axes
/// (see [`crate::config::CheckMethod`]); distance strategies use all three.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Squared Euclidean distance to another position.
    pub fn distance_squared(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: Vec3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Whether every component is finite (no NaN or infinity).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Opaque scene (room) key.
///
/// The empty string is reserved as "no scene": entities carrying it are never
/// placed in a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SceneId(pub String);

impl SceneId {
    /// Creates a scene key from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The invalid, empty scene key.
    pub fn none() -> Self {
        Self(String::new())
    }

    /// Whether this key names a real partition.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SceneId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Match identifier set explicitly on entities by game logic.
///
/// [`MatchId::EMPTY`] is the sentinel for "not in a match" and is never a
/// valid partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    /// The "empty" sentinel.
    pub const EMPTY: MatchId = MatchId(Uuid::nil());

    /// Creates a new random match ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Whether this is a real match (not the sentinel).
    pub fn is_valid(&self) -> bool {
        *self != Self::EMPTY
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A networked, replicated object as seen by the interest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id
    pub id: EntityId,
    /// World position
    pub position: Vec3,
    /// Scene the entity lives in; [`SceneId::none`] keeps it out of every scene
    pub scene: SceneId,
    /// Match marker; `None` means the entity carries no match marker at all
    pub match_id: Option<MatchId>,
    /// Per-entity visibility range override
    pub visibility_range: Option<f64>,
    /// Hidden from every connection regardless of strategy
    pub force_hidden: bool,
}

impl Entity {
    /// Creates an entity at `position` with no scene, no match and no overrides.
    pub fn new(id: EntityId, position: Vec3) -> Self {
        Self {
            id,
            position,
            scene: SceneId::none(),
            match_id: None,
            visibility_range: None,
            force_hidden: false,
        }
    }

    pub fn with_scene(mut self, scene: impl Into<SceneId>) -> Self {
        self.scene = scene.into();
        self
    }

    pub fn with_match(mut self, match_id: MatchId) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn with_visibility_range(mut self, range: f64) -> Self {
        self.visibility_range = Some(range);
        self
    }

    pub fn with_force_hidden(mut self, hidden: bool) -> Self {
        self.force_hidden = hidden;
        self
    }

    /// The entity's match, if it carries a valid one.
    pub fn valid_match(&self) -> Option<MatchId> {
        self.match_id.filter(MatchId::is_valid)
    }
}

/// A client session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique id
    pub id: ConnectionId,
    /// The client finished loading and may receive spawns
    pub ready: bool,
    /// The session passed authentication
    pub authenticated: bool,
    /// The player entity this connection controls, if any
    pub owned_entity: Option<EntityId>,
}

impl Connection {
    /// Creates a ready, authenticated connection owning `entity`.
    pub fn new(id: ConnectionId, owned_entity: Option<EntityId>) -> Self {
        Self {
            id,
            ready: true,
            authenticated: true,
            owned_entity,
        }
    }
}

/// The explicit entity and connection tables the engine operates on.
#[derive(Debug, Clone, Default)]
pub struct World {
    /// Every live entity, keyed by id
    pub entities: HashMap<EntityId, Entity>,
    /// Every connection, keyed by id
    pub connections: HashMap<ConnectionId, Connection>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entity and returns its id.
    pub fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.insert(id, entity);
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Inserts or replaces a connection and returns its id.
    pub fn insert_connection(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        id
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// The entity a connection owns, provided the connection may observe at all:
    /// it must be ready, authenticated and own an entity that is still alive.
    pub fn observer_entity(&self, connection: &Connection) -> Option<&Entity> {
        if !connection.ready || !connection.authenticated {
            return None;
        }
        connection
            .owned_entity
            .and_then(|entity_id| self.entities.get(&entity_id))
    }

    /// Every connection allowed to observe, paired with its owned entity.
    pub fn observers(&self) -> impl Iterator<Item = (&Connection, &Entity)> + '_ {
        self.connections
            .values()
            .filter_map(move |connection| self.observer_entity(connection).map(|owned| (connection, owned)))
    }

    /// Maps each owned entity back to the observing connections that own it.
    pub fn owner_index(&self) -> HashMap<EntityId, Vec<ConnectionId>> {
        let mut owners: HashMap<EntityId, Vec<ConnectionId>> = HashMap::new();
        for (connection, owned) in self.observers() {
            owners.entry(owned.id).or_default().push(connection.id);
        }
        owners
    }
}
