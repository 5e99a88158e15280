//! Shared machinery for strategies that pre-filter by a partition key.

use super::{ensure_finite, CandidateBatch, RebuildScope};
use crate::error::StrategyError;
use crate::spatial::PartitionIndex;
use crate::types::{Connection, ConnectionId, Entity, EntityId, World};
use std::collections::HashSet;
use std::hash::Hash;
use tracing::trace;

/// Partition index plus the bookkeeping every partitioned strategy needs:
/// entities that dropped out of all partitions and a rebuild counter.
#[derive(Debug, Clone)]
pub(crate) struct PartitionTracker<K> {
    index: PartitionIndex<K>,
    /// Entities that left every partition since the last rebuild
    evicted: HashSet<EntityId>,
    partitions_rebuilt: u64,
}

impl<K> Default for PartitionTracker<K> {
    fn default() -> Self {
        Self {
            index: PartitionIndex::default(),
            evicted: HashSet::new(),
            partitions_rebuilt: 0,
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> PartitionTracker<K> {
    /// Records `entity` under `key`. Returns `true` when its partition changed.
    pub fn sync(&mut self, entity: EntityId, key: Option<K>) -> bool {
        let had_key = self.index.key_of(entity).is_some();
        let entering = key.is_some();
        if !self.index.assign(entity, key) {
            return false;
        }

        if entering {
            self.evicted.remove(&entity);
        } else if had_key {
            self.evicted.insert(entity);
        }
        true
    }

    /// Forgets a destroyed entity, dirtying its partition.
    pub fn remove(&mut self, entity: EntityId) -> Option<K> {
        self.evicted.remove(&entity);
        self.index.remove(entity)
    }

    /// Dirties the partition `entity` currently belongs to.
    pub fn touch(&mut self, entity: EntityId) {
        if let Some(key) = self.index.key_of(entity).cloned() {
            self.index.mark_dirty(key);
        }
    }

    /// Dirties the partitions of the entities a connection owned before and after a change.
    pub fn touch_connection(&mut self, previous: &Connection, current: &Connection) {
        for owned in [previous.owned_entity, current.owned_entity].into_iter().flatten() {
            self.touch(owned);
        }
    }

    /// Recomputes candidates for dirty partitions, or for all of them on a
    /// full rebuild.
    ///
    /// Within a partition, each member entity is offered to every observing
    /// connection whose owned entity is also a member; `admits` decides.
    pub fn collect<KF, AF>(&mut self, world: &World, scope: RebuildScope, key_of: KF, admits: AF) -> CandidateBatch
    where
        KF: Fn(&Entity) -> Option<K>,
        AF: Fn(&Entity, &Entity) -> Result<bool, StrategyError>,
    {
        let mut batch = CandidateBatch::new();

        if scope == RebuildScope::Full {
            for entity in world.entities.values() {
                let key = key_of(entity);
                if key.is_none() {
                    batch.insert_empty(entity.id);
                }
                self.sync(entity.id, key);
            }
            self.index.mark_all_dirty();
        }

        for entity_id in self.evicted.drain() {
            if world.entities.contains_key(&entity_id) {
                batch.insert_empty(entity_id);
            }
        }

        let dirty = self.index.take_dirty();
        if dirty.is_empty() {
            return batch;
        }

        let owners = world.owner_index();
        for key in dirty {
            let Some(members) = self.index.members(&key) else {
                trace!("dirty partition {:?} no longer exists", key);
                continue;
            };
            self.partitions_rebuilt += 1;

            let observers: Vec<(ConnectionId, &Entity)> = members
                .iter()
                .filter_map(|member| owners.get(member).zip(world.entities.get(member)))
                .flat_map(|(connections, owned)| connections.iter().map(move |id| (*id, owned)))
                .collect();

            for member in members {
                let Some(entity) = world.entities.get(member) else {
                    continue;
                };
                if entity.force_hidden {
                    batch.insert_empty(entity.id);
                    continue;
                }

                let mut visible = HashSet::with_capacity(observers.len());
                let mut failure = None;
                for (connection_id, owned) in &observers {
                    match admits(entity, *owned) {
                        Ok(true) => {
                            visible.insert(*connection_id);
                        }
                        Ok(false) => {}
                        Err(error) => {
                            failure = Some(error);
                            break;
                        }
                    }
                }

                match failure {
                    Some(error) => batch.fail(entity.id, error),
                    None => batch.insert(entity.id, visible),
                }
            }
        }

        batch
    }

    pub fn index(&self) -> &PartitionIndex<K> {
        &self.index
    }

    pub fn partitions_rebuilt(&self) -> u64 {
        self.partitions_rebuilt
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.evicted.clear();
        self.partitions_rebuilt = 0;
    }
}

/// Admits every pair; partition membership alone decides.
pub(crate) fn admit_all(_entity: &Entity, _observer: &Entity) -> Result<bool, StrategyError> {
    Ok(true)
}

/// Admits pairs strictly closer than `range`, failing on unmeasurable positions.
pub(crate) fn admit_within(entity: &Entity, observer: &Entity, range: f64) -> Result<bool, StrategyError> {
    ensure_finite(entity)?;
    if !observer.position.is_finite() {
        return Ok(false);
    }
    Ok(entity.position.distance_squared(observer.position) < range * range)
}
