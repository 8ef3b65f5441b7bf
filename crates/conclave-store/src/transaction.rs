use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{Entity, EntityKey, StoredEntity};
use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitBatch, EntityStore, Write};

/// Retry policy for [`run_atomic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

impl Default for AtomicPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl AtomicPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

/// Buffered view of the store used by one attempt of an atomic unit.
///
/// Every `get` records the version it observed; every `put`/`delete` is
/// buffered. Reads of a key that was already written in this unit return the
/// buffered value. Nothing reaches the store until the unit commits.
pub struct Transaction<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    reads: BTreeMap<EntityKey, Option<u64>>,
    writes: BTreeMap<EntityKey, Write>,
}

impl<'a, S: EntityStore + ?Sized> Transaction<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Read an entity, recording its version in the unit's read set.
    pub fn get<E: Entity>(&mut self, key: &EntityKey) -> StoreResult<Option<E>> {
        if let Some(write) = self.writes.get(key) {
            return match write {
                Write::Put(stored) => stored.decode::<E>().map(Some),
                Write::Delete(_) => Ok(None),
            };
        }
        let stored = self.store.get(key)?;
        self.reads
            .entry(key.clone())
            .or_insert_with(|| stored.as_ref().map(|s| s.version));
        stored.map(|s| s.decode::<E>()).transpose()
    }

    /// Buffer a write of `entity`.
    pub fn put<E: Entity>(&mut self, entity: &E) -> StoreResult<()> {
        let stored = StoredEntity::encode(entity)?;
        self.writes.insert(stored.key.clone(), Write::Put(stored));
        Ok(())
    }

    /// Buffer a deletion.
    pub fn delete(&mut self, key: EntityKey) {
        self.writes.insert(key.clone(), Write::Delete(key));
    }

    fn into_batch(self) -> CommitBatch {
        CommitBatch {
            reads: self.reads.into_iter().collect(),
            writes: self.writes.into_values().collect(),
        }
    }
}

/// Run `body` as an optimistic atomic unit against `store`.
///
/// Each attempt starts from fresh reads. If the commit fails with
/// [`StoreError::Conflict`] the whole body runs again, up to
/// `policy.max_attempts` times, after which
/// [`StoreError::AttemptsExhausted`] is returned. Errors returned by `body`
/// abort immediately without committing and are never retried.
pub fn run_atomic<S, T, E, F>(store: &S, policy: &AtomicPolicy, mut body: F) -> Result<T, E>
where
    S: EntityStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut Transaction<'_, S>) -> Result<T, E>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let mut tx = Transaction::new(store);
        let value = body(&mut tx)?;
        match store.commit(tx.into_batch()) {
            Ok(()) => return Ok(value),
            Err(e) if e.is_conflict() => {
                debug!(attempt, error = %e, "atomic unit conflicted");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::AttemptsExhausted { attempts }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryEntityStore;
    use crate::traits::EntityStoreExt;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        value: i64,
    }

    impl Entity for Counter {
        const KIND: &'static str = "Counter";

        fn id(&self) -> String {
            self.name.clone()
        }
    }

    fn counter(name: &str, value: i64) -> Counter {
        Counter {
            name: name.into(),
            value,
        }
    }

    #[test]
    fn commits_all_writes_together() {
        let store = InMemoryEntityStore::new();
        run_atomic(&store, &AtomicPolicy::default(), |tx| {
            tx.put(&counter("a", 1))?;
            tx.put(&counter("b", 2))?;
            Ok::<_, StoreError>(())
        })
        .unwrap();

        assert_eq!(store.len(), 2);
        let b: Counter = store.load(&Counter::key_for("b")).unwrap().unwrap();
        assert_eq!(b.value, 2);
    }

    #[test]
    fn body_error_discards_buffered_writes() {
        let store = InMemoryEntityStore::new();
        let result: Result<(), StoreError> = run_atomic(&store, &AtomicPolicy::default(), |tx| {
            tx.put(&counter("a", 1))?;
            Err(StoreError::Unavailable("boom".into()))
        });
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn reads_see_own_buffered_writes() {
        let store = InMemoryEntityStore::new();
        run_atomic(&store, &AtomicPolicy::default(), |tx| {
            tx.put(&counter("a", 5))?;
            let seen: Option<Counter> = tx.get(&Counter::key_for("a"))?;
            assert_eq!(seen.map(|c| c.value), Some(5));
            tx.delete(Counter::key_for("a"));
            let gone: Option<Counter> = tx.get(&Counter::key_for("a"))?;
            assert!(gone.is_none());
            Ok::<_, StoreError>(())
        })
        .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn conflicting_write_triggers_retry_with_fresh_reads() {
        let store = InMemoryEntityStore::new();
        store.save(&counter("a", 0)).unwrap();
        let runs = AtomicU32::new(0);

        let final_value = run_atomic(&store, &AtomicPolicy::default(), |tx| {
            let mut c: Counter = tx.get(&Counter::key_for("a"))?.unwrap();
            if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                // Another writer sneaks in between our read and our commit.
                store.save(&counter("a", 100)).unwrap();
            }
            c.value += 1;
            tx.put(&c)?;
            Ok::<_, StoreError>(c.value)
        })
        .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(final_value, 101);
    }

    #[test]
    fn exhausted_attempts_are_reported() {
        let store = InMemoryEntityStore::new();
        store.save(&counter("a", 0)).unwrap();

        let result: Result<(), StoreError> =
            run_atomic(&store, &AtomicPolicy::with_attempts(2), |tx| {
                let c: Counter = tx.get(&Counter::key_for("a"))?.unwrap();
                store.save(&counter("a", c.value + 10)).unwrap();
                tx.put(&c)?;
                Ok(())
            });

        assert!(matches!(
            result,
            Err(StoreError::AttemptsExhausted { attempts: 2 })
        ));
        let c: Counter = store.load(&Counter::key_for("a")).unwrap().unwrap();
        assert_eq!(c.value, 20);
    }

    #[test]
    fn absent_read_conflicts_with_concurrent_create() {
        let store = InMemoryEntityStore::new();
        let runs = AtomicU32::new(0);

        let created = run_atomic(&store, &AtomicPolicy::default(), |tx| {
            let existing: Option<Counter> = tx.get(&Counter::key_for("a"))?;
            if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                store.save(&counter("a", 7)).unwrap();
            }
            match existing {
                Some(c) => Ok::<_, StoreError>(c),
                None => {
                    let fresh = counter("a", 0);
                    tx.put(&fresh)?;
                    Ok(fresh)
                }
            }
        })
        .unwrap();

        assert_eq!(created.value, 7);
    }

    #[test]
    fn concurrent_increments_are_serializable() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.save(&counter("a", 0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        run_atomic(store.as_ref(), &AtomicPolicy::with_attempts(1_000), |tx| {
                            let mut c: Counter = tx.get(&Counter::key_for("a"))?.unwrap();
                            c.value += 1;
                            tx.put(&c)?;
                            Ok::<_, StoreError>(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }

        let c: Counter = store.load(&Counter::key_for("a")).unwrap().unwrap();
        assert_eq!(c.value, 200);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let store = InMemoryEntityStore::new();
        run_atomic(&store, &AtomicPolicy::with_attempts(0), |tx| {
            tx.put(&counter("a", 1))?;
            Ok::<_, StoreError>(())
        })
        .unwrap();
        assert_eq!(store.len(), 1);
    }
}
