use crate::entity::{Entity, EntityKey, StoredEntity};
use crate::error::StoreResult;
use crate::query::Query;

/// A single buffered mutation inside a [`CommitBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Put(StoredEntity),
    Delete(EntityKey),
}

impl Write {
    pub fn key(&self) -> &EntityKey {
        match self {
            Self::Put(entity) => &entity.key,
            Self::Delete(key) => key,
        }
    }
}

/// Everything an atomic unit needs the backend to apply.
///
/// `reads` holds the version each entity had when the unit read it (`None`
/// for "did not exist"). The backend must apply `writes` only if every read
/// version is still current, and must apply them all together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitBatch {
    pub reads: Vec<(EntityKey, Option<u64>)>,
    pub writes: Vec<Write>,
}

impl CommitBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Structured entity store.
///
/// All implementations must satisfy these invariants:
/// - `put` and `delete` are individually atomic and bump the entity version.
/// - `commit` is all-or-nothing and fails with
///   [`StoreError::Conflict`](crate::StoreError::Conflict) when any read
///   version recorded in the batch is stale.
/// - `query` results reflect every commit that returned before the query
///   started.
/// - All backend errors are propagated, never silently ignored.
pub trait EntityStore: Send + Sync {
    /// Read an entity by key.
    ///
    /// Returns `Ok(None)` if the entity does not exist.
    fn get(&self, key: &EntityKey) -> StoreResult<Option<StoredEntity>>;

    /// Write an entity unconditionally and return its key.
    ///
    /// The `version` field of the argument is ignored; the store assigns the
    /// next version.
    fn put(&self, entity: StoredEntity) -> StoreResult<EntityKey>;

    /// Delete an entity by key. Returns `true` if the entity existed.
    fn delete(&self, key: &EntityKey) -> StoreResult<bool>;

    /// Run a query and return matching entities in query order.
    fn query(&self, query: &Query) -> StoreResult<Vec<StoredEntity>>;

    /// Apply a batch of writes atomically, guarded by its read versions.
    fn commit(&self, batch: CommitBatch) -> StoreResult<()>;

    /// Read multiple entities.
    ///
    /// Default implementation calls `get()` for each key. Backends may
    /// override for fewer round-trips.
    fn get_many(&self, keys: &[EntityKey]) -> StoreResult<Vec<Option<StoredEntity>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }
}

/// Typed convenience methods over any [`EntityStore`], including
/// `dyn EntityStore`.
pub trait EntityStoreExt: EntityStore {
    /// Load and decode an entity.
    fn load<E: Entity>(&self, key: &EntityKey) -> StoreResult<Option<E>> {
        self.get(key)?.map(|stored| stored.decode::<E>()).transpose()
    }

    /// Encode and write an entity unconditionally.
    fn save<E: Entity>(&self, entity: &E) -> StoreResult<EntityKey> {
        self.put(StoredEntity::encode(entity)?)
    }

    /// Run a query and decode every result.
    fn find<E: Entity>(&self, query: &Query) -> StoreResult<Vec<E>> {
        self.query(query)?
            .iter()
            .map(|stored| stored.decode::<E>())
            .collect()
    }
}

impl<S: EntityStore + ?Sized> EntityStoreExt for S {}
