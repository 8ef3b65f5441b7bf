//! Store wrappers used by the core tests to inject failures and races.

use std::sync::{Arc, Mutex};

use conclave_store::{
    CommitBatch, EntityKey, EntityStore, InMemoryEntityStore, Query, StoreError, StoreResult,
    StoredEntity,
};

type Hook = Box<dyn FnOnce() + Send>;

/// Delegates to an inner store but rejects every commit that writes.
pub(crate) struct FailingStore {
    inner: Arc<InMemoryEntityStore>,
}

impl FailingStore {
    pub(crate) fn new(inner: Arc<InMemoryEntityStore>) -> Self {
        Self { inner }
    }
}

impl EntityStore for FailingStore {
    fn get(&self, key: &EntityKey) -> StoreResult<Option<StoredEntity>> {
        self.inner.get(key)
    }

    fn put(&self, entity: StoredEntity) -> StoreResult<EntityKey> {
        self.inner.put(entity)
    }

    fn delete(&self, key: &EntityKey) -> StoreResult<bool> {
        self.inner.delete(key)
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<StoredEntity>> {
        self.inner.query(query)
    }

    fn commit(&self, batch: CommitBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return self.inner.commit(batch);
        }
        Err(StoreError::Unavailable("injected commit failure".into()))
    }
}

/// Delegates to an inner store and runs a hook right before the n-th commit.
pub(crate) struct HookStore {
    inner: Arc<InMemoryEntityStore>,
    commits: Mutex<u32>,
    hook: Mutex<Option<(u32, Hook)>>,
}

impl HookStore {
    pub(crate) fn new(inner: Arc<InMemoryEntityStore>) -> Self {
        Self {
            inner,
            commits: Mutex::new(0),
            hook: Mutex::new(None),
        }
    }

    /// Run `hook` once, just before commit number `nth` (1-based).
    pub(crate) fn before_commit(&self, nth: u32, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock().unwrap() = Some((nth, Box::new(hook)));
    }

    /// Commits attempted so far, including failed ones.
    pub(crate) fn commit_count(&self) -> u32 {
        *self.commits.lock().unwrap()
    }
}

impl EntityStore for HookStore {
    fn get(&self, key: &EntityKey) -> StoreResult<Option<StoredEntity>> {
        self.inner.get(key)
    }

    fn put(&self, entity: StoredEntity) -> StoreResult<EntityKey> {
        self.inner.put(entity)
    }

    fn delete(&self, key: &EntityKey) -> StoreResult<bool> {
        self.inner.delete(key)
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<StoredEntity>> {
        self.inner.query(query)
    }

    fn commit(&self, batch: CommitBatch) -> StoreResult<()> {
        let count = {
            let mut commits = self.commits.lock().unwrap();
            *commits += 1;
            *commits
        };
        let due = {
            let mut slot = self.hook.lock().unwrap();
            match slot.as_ref() {
                Some((nth, _)) if *nth == count => slot.take().map(|(_, hook)| hook),
                _ => None,
            }
        };
        if let Some(hook) = due {
            hook();
        }
        self.inner.commit(batch)
    }
}
