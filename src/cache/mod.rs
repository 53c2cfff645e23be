//! Generic reference-data caching layer.
//!
//! This module knows nothing about specific record kinds. It provides:
//! - Composite `(domain, service, workplace)` keys
//! - A namespace -> key -> entry store that is populated and refreshed as a whole
//! - Strict and safe keyed lookups, single and batched, with sorted list output
//! - The adapter contract each record kind implements to supply fresh data

mod adapter;
mod key;
mod layer;
mod lookup;
mod storage;
mod traits;

pub use adapter::{build_views, fetch_namespace, DerivedView, SourceAdapter};
pub use key::{composite_key, CacheKey, KEY_SEPARATOR};
pub use layer::CacheLayer;
pub use lookup::CachedLookup;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{
  group_records, merge_synthetic, padded_sequence, CacheEntry, CachedRecord, NamespaceData,
};
