//! Document stores for wallet summaries.
//!
//! [`SummaryStore`] is the narrow keyed-collection interface the resolver
//! depends on. Two implementations ship:
//!
//! - [`LmdbSummaryStore`]: production store, persisted with LMDB.
//! - [`InMemorySummaryStore`]: tests and local development.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::{LmdbStoreError, LmdbSummaryStore};
pub use memory::InMemorySummaryStore;
pub use traits::{CacheStats, StoreResult, SummaryStore};
