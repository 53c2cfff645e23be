//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

use super::key::CacheKey;

/// Width numeric sequences are zero-padded to before they are compared as strings.
const SEQUENCE_WIDTH: usize = 10;

/// Trait for records that can be cached.
///
/// A record's domain, service and workplace form its [`CacheKey`]. Kinds whose
/// records share a key carry an inner `code`; kinds without one are stored as
/// a single record per key. Which shape applies must be the same for every
/// record of a kind.
pub trait CachedRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Namespace name the kind is stored under (e.g. "SystemParameter").
  fn namespace() -> &'static str;

  fn cache_key(&self) -> CacheKey;

  /// Inner discriminator within a key, or None for single-record kinds.
  fn code(&self) -> Option<&str>;

  /// Ordering used by list output only. Independent of the storage key.
  fn sort_key(&self) -> String;
}

/// What is stored for one [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEntry<T> {
  Single(T),
  Coded(BTreeMap<String, T>),
}

/// The full content of one namespace.
pub type NamespaceData<T> = BTreeMap<CacheKey, CacheEntry<T>>;

impl<T> CacheEntry<T> {
  /// The result a safe lookup returns for a missing key.
  pub fn empty() -> Self {
    Self::Coded(BTreeMap::new())
  }

  pub fn is_empty(&self) -> bool {
    match self {
      Self::Single(_) => false,
      Self::Coded(map) => map.is_empty(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::Single(_) => 1,
      Self::Coded(map) => map.len(),
    }
  }

  /// Record for an inner code. Always None for single entries.
  pub fn get(&self, code: &str) -> Option<&T> {
    match self {
      Self::Single(_) => None,
      Self::Coded(map) => map.get(code),
    }
  }

  pub fn single(&self) -> Option<&T> {
    match self {
      Self::Single(record) => Some(record),
      Self::Coded(_) => None,
    }
  }

  pub fn codes(&self) -> Vec<&str> {
    match self {
      Self::Single(_) => Vec::new(),
      Self::Coded(map) => map.keys().map(String::as_str).collect(),
    }
  }

  pub fn records(&self) -> Vec<&T> {
    match self {
      Self::Single(record) => vec![record],
      Self::Coded(map) => map.values().collect(),
    }
  }

  pub fn into_records(self) -> Vec<T> {
    match self {
      Self::Single(record) => vec![record],
      Self::Coded(map) => map.into_values().collect(),
    }
  }
}

impl<T: CachedRecord> CacheEntry<T> {
  /// Records ordered by their sort key, ascending.
  pub fn into_sorted(self) -> Vec<T> {
    let mut records = self.into_records();
    records.sort_by_cached_key(|r| r.sort_key());
    records
  }
}

/// Group transformed records into the per-key storage shape.
///
/// Records without a code are stored directly at their key. Coded records go
/// into the key's code map; a repeated `(key, code)` pair overwrites the earlier record.
pub fn group_records<T: CachedRecord>(records: impl IntoIterator<Item = T>) -> NamespaceData<T> {
  let mut data = BTreeMap::new();

  for record in records {
    let key = record.cache_key();
    match record.code().map(str::to_owned) {
      None => {
        data.insert(key, CacheEntry::Single(record));
      }
      Some(code) => {
        let entry = data.entry(key).or_insert_with(CacheEntry::empty);
        if let CacheEntry::Single(_) = entry {
          *entry = CacheEntry::empty();
        }
        if let CacheEntry::Coded(map) = entry {
          map.insert(code, record);
        }
      }
    }
  }

  data
}

/// Merge synthetic entries over fetched data.
///
/// Coded entries are merged code by code with the synthetic record winning.
/// Any other combination replaces the fetched entry outright.
pub fn merge_synthetic<T>(data: &mut NamespaceData<T>, synthetic: NamespaceData<T>) {
  for (key, entry) in synthetic {
    let merged = match (data.remove(&key), entry) {
      (Some(CacheEntry::Coded(mut existing)), CacheEntry::Coded(extra)) => {
        existing.extend(extra);
        CacheEntry::Coded(existing)
      }
      (_, entry) => entry,
    };
    data.insert(key, merged);
  }
}

/// Zero-pad a numeric sequence so "2" sorts before "10".
pub fn padded_sequence(sequence: &str) -> String {
  format!("{:0>width$}", sequence.trim(), width = SEQUENCE_WIDTH)
}
