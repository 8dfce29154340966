//! Wrapped Storage - Summary Store and Cache-Fill Resolver
//!
//! Defines the document store abstraction, the warehouse source trait, and the
//! resolver that ties them together with negative caching. The BigQuery
//! source lives in wrapped-api.

pub mod inflight;
pub mod resolver;
pub mod source;
pub mod store;

pub use inflight::{InFlightGuard, InFlightKeys};
pub use resolver::{LookupOutcome, Resolution, SummaryResolver};
pub use source::SummarySource;
pub use store::{
    CacheStats, InMemorySummaryStore, LmdbStoreError, LmdbSummaryStore, StoreResult,
    SummaryStore,
};
