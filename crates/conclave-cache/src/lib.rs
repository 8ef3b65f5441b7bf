//! Key-value cache for Conclave.
//!
//! A cache is a best-effort accelerator in front of the entity store: every
//! value it holds can be recomputed from the store, so callers treat cache
//! errors as misses.
//!
//! # Components
//!
//! - [`KeyValueCache`] -- object-safe backend trait (get, set with TTL, delete)
//! - [`CacheExt`] -- JSON-typed helpers over any [`KeyValueCache`]
//! - [`InMemoryCache`] -- `HashMap`-based backend with lazy expiry

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryCache;
pub use traits::{CacheExt, KeyValueCache};
