use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::entity::{EntityKey, StoredEntity};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::traits::{CommitBatch, EntityStore, Write};

#[derive(Default)]
struct State {
    entities: BTreeMap<EntityKey, StoredEntity>,
    /// Store-wide version clock. Versions are never reused, even across a
    /// delete and re-create of the same key.
    clock: u64,
}

impl State {
    fn apply_put(&mut self, mut entity: StoredEntity) -> EntityKey {
        self.clock += 1;
        entity.version = self.clock;
        let key = entity.key.clone();
        self.entities.insert(key.clone(), entity);
        key
    }
}

/// In-memory, BTreeMap-based entity store.
///
/// Intended for tests and embedding. All entities are held behind a single
/// `RwLock`; `commit` validates and applies a batch while holding the write
/// lock, which makes every batch serializable against every other write.
pub struct InMemoryEntityStore {
    state: RwLock<State>,
}

impl InMemoryEntityStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Number of entities currently stored, across all kinds.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entities of one kind.
    pub fn count(&self, kind: &str) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .keys()
            .filter(|key| key.kind == kind)
            .count()
    }

    /// Remove all entities from the store.
    pub fn clear(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .clear();
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("entity store lock poisoned".into()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("entity store lock poisoned".into()))
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, key: &EntityKey) -> StoreResult<Option<StoredEntity>> {
        Ok(self.read_state()?.entities.get(key).cloned())
    }

    fn put(&self, entity: StoredEntity) -> StoreResult<EntityKey> {
        Ok(self.write_state()?.apply_put(entity))
    }

    fn delete(&self, key: &EntityKey) -> StoreResult<bool> {
        Ok(self.write_state()?.entities.remove(key).is_some())
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<StoredEntity>> {
        let state = self.read_state()?;
        let mut results: Vec<StoredEntity> = state
            .entities
            .values()
            .filter(|entity| query.matches(entity))
            .cloned()
            .collect();
        drop(state);
        query.finish(&mut results);
        Ok(results)
    }

    fn commit(&self, batch: CommitBatch) -> StoreResult<()> {
        let mut state = self.write_state()?;
        for (key, expected) in &batch.reads {
            let found = state.entities.get(key).map(|e| e.version);
            if found != *expected {
                return Err(StoreError::Conflict {
                    key: key.clone(),
                    expected: *expected,
                    found,
                });
            }
        }
        for write in batch.writes {
            match write {
                Write::Put(entity) => {
                    state.apply_put(entity);
                }
                Write::Delete(key) => {
                    state.entities.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEntityStore")
            .field("entity_count", &self.len())
            .finish()
    }
}
