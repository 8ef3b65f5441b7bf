//! Structured entity storage for Conclave.
//!
//! This crate defines the storage contract every Conclave service is written
//! against. Entities are JSON documents addressed by an [`EntityKey`]
//! (`kind` + `id`), optionally parented to another entity so that they can
//! be queried by ancestor.
//!
//! # Components
//!
//! - [`EntityStore`] -- object-safe backend trait (get, put, delete, query, commit)
//! - [`EntityStoreExt`] -- typed helpers over any [`EntityStore`]
//! - [`Query`] -- kind, ancestor, equality/range filters, ordering, limit
//! - [`Transaction`] / [`run_atomic`] -- optimistic atomic units with retry
//! - [`InMemoryEntityStore`] -- `BTreeMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every stored entity carries a version that increases on each write.
//! 2. An atomic unit commits only if every entity it read is still at the
//!    version it saw (absent entities must still be absent).
//! 3. A commit applies all of its writes or none of them.
//! 4. The store never interprets entity contents beyond query field lookup.

pub mod entity;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;
pub mod transaction;

pub use entity::{Entity, EntityKey, StoredEntity};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEntityStore;
pub use query::{Direction, Filter, FilterOp, Order, Query};
pub use traits::{CommitBatch, EntityStore, EntityStoreExt, Write};
pub use transaction::{run_atomic, AtomicPolicy, Transaction};
