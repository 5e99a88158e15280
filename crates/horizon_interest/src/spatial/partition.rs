/// Partition index keyed by scene or match
use crate::types::EntityId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::trace;

/// Groups entities by an opaque partition key and tracks which partitions
/// need their observers recomputed.
///
/// Keeps a reverse index of each entity's last known key so a key change can
/// dirty exactly the old and the new partition. Partitions are removed the
/// moment their last member leaves.
#[derive(Debug, Clone)]
pub struct PartitionIndex<K> {
    /// Partition key to member entities
    members: HashMap<K, HashSet<EntityId>>,
    /// Entity to last recorded key
    keys: HashMap<EntityId, K>,
    /// Partitions queued for recomputation
    dirty: HashSet<K>,
}

impl<K> Default for PartitionIndex<K> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
            keys: HashMap::new(),
            dirty: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> PartitionIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entity` under `key`, or removes it when `key` is `None`.
    ///
    /// Returns `true` when the recorded key changed. Both the previous and the
    /// new partition are marked dirty.
    pub fn assign(&mut self, entity: EntityId, key: Option<K>) -> bool {
        if self.keys.get(&entity) == key.as_ref() {
            return false;
        }

        self.remove(entity);

        if let Some(key) = key {
            trace!("partition {:?} gains entity {}", key, entity);
            self.members.entry(key.clone()).or_default().insert(entity);
            self.keys.insert(entity, key.clone());
            self.dirty.insert(key);
        }
        true
    }

    /// Drops `entity` from its partition, dirtying that partition.
    ///
    /// Returns the key the entity was recorded under.
    pub fn remove(&mut self, entity: EntityId) -> Option<K> {
        let key = self.keys.remove(&entity)?;

        if let Some(members) = self.members.get_mut(&key) {
            members.remove(&entity);
            if members.is_empty() {
                trace!("partition {:?} is empty, pruning", key);
                self.members.remove(&key);
            }
        }

        self.dirty.insert(key.clone());
        Some(key)
    }

    /// Marks a partition for recomputation.
    pub fn mark_dirty(&mut self, key: K) {
        self.dirty.insert(key);
    }

    /// Marks every existing partition for recomputation.
    pub fn mark_all_dirty(&mut self) {
        self.dirty.extend(self.members.keys().cloned());
    }

    /// Hands out the dirty set and starts a fresh one.
    ///
    /// Every dirtying event since the last call is coalesced into one entry
    /// per partition.
    pub fn take_dirty(&mut self) -> HashSet<K> {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self, key: &K) -> bool {
        self.dirty.contains(key)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Members of a partition, if it exists.
    pub fn members(&self, key: &K) -> Option<&HashSet<EntityId>> {
        self.members.get(key)
    }

    /// Last recorded key of an entity.
    pub fn key_of(&self, entity: EntityId) -> Option<&K> {
        self.keys.get(&entity)
    }

    pub fn partitions(&self) -> impl Iterator<Item = (&K, &HashSet<EntityId>)> + '_ {
        self.members.iter()
    }

    /// Number of non-empty partitions.
    pub fn partition_count(&self) -> usize {
        self.members.len()
    }

    /// Number of entities with a recorded key.
    pub fn tracked_entities(&self) -> usize {
        self.keys.len()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.keys.clear();
        self.dirty.clear();
    }
}
