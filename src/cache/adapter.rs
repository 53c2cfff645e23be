//! The seam between the cache and the back office.
//!
//! Each cached kind provides a [`SourceAdapter`] that knows how to fetch its
//! raw rows and turn them into records. [`fetch_namespace`] runs the common
//! pipeline: fetch, transform, group, then merge synthetic records on top.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::traits::{group_records, merge_synthetic, CacheEntry, CachedRecord, NamespaceData};
use crate::error::Result;

/// Source of fresh data for one namespace.
pub trait SourceAdapter: Send + Sync {
  type Record: CachedRecord;
  /// Row shape as delivered by the back office.
  type Raw: DeserializeOwned + Send;

  /// Drop rows that fail [`transform`](Self::transform) with a warning instead
  /// of failing the whole namespace.
  const SKIP_INVALID_ROWS: bool = false;

  /// Fetch every raw row for the namespace.
  ///
  /// Any transport or service failure must be returned as an error. An empty
  /// vector means the back office genuinely holds no rows.
  fn fetch_raw(&self) -> impl Future<Output = Result<Vec<Self::Raw>>> + Send;

  /// Convert one raw row into a record.
  fn transform(&self, raw: Self::Raw) -> Result<Self::Record>;

  /// Records the back office does not hold: application constants and views
  /// derived from the freshly fetched data.
  fn synthetic_records(
    &self,
    _fetched: &NamespaceData<Self::Record>,
  ) -> NamespaceData<Self::Record> {
    BTreeMap::new()
  }
}

/// Build a namespace's complete content from its adapter.
pub async fn fetch_namespace<A: SourceAdapter>(adapter: &A) -> Result<NamespaceData<A::Record>> {
  let namespace = A::Record::namespace();
  let raw = adapter.fetch_raw().await?;
  let rows = raw.len();

  let mut records = Vec::with_capacity(rows);
  for row in raw {
    match adapter.transform(row) {
      Ok(record) => records.push(record),
      Err(e) if A::SKIP_INVALID_ROWS => warn!(namespace, error = %e, "skipping invalid row"),
      Err(e) => return Err(e),
    }
  }

  let mut data = group_records(records);
  let synthetic = adapter.synthetic_records(&data);
  merge_synthetic(&mut data, synthetic);

  debug!(namespace, rows, keys = data.len(), "built namespace");
  Ok(data)
}

/// A coded entry assembled from other entries of the same namespace.
///
/// Records from each upstream key are re-keyed onto the target key through
/// `rekey`. Later upstream keys win when codes collide.
pub struct DerivedView<T> {
  target: CacheKey,
  upstream: Vec<CacheKey>,
  rekey: fn(&T, &CacheKey) -> T,
}

impl<T: CachedRecord> DerivedView<T> {
  pub fn new(target: CacheKey, upstream: Vec<CacheKey>, rekey: fn(&T, &CacheKey) -> T) -> Self {
    Self {
      target,
      upstream,
      rekey,
    }
  }

  /// Build the view, or None when none of its upstream keys were fetched.
  pub fn build(&self, fetched: &NamespaceData<T>) -> Option<CacheEntry<T>> {
    let mut combined = BTreeMap::new();
    let mut found = false;

    for key in &self.upstream {
      let Some(entry) = fetched.get(key) else {
        continue;
      };
      found = true;

      for record in entry.records() {
        let derived = (self.rekey)(record, &self.target);
        if let Some(code) = derived.code().map(str::to_owned) {
          combined.insert(code, derived);
        }
      }
    }

    if !found {
      debug!(
        namespace = T::namespace(),
        target = %self.target,
        "no upstream data for derived view"
      );
      return None;
    }

    Some(CacheEntry::Coded(combined))
  }
}

/// Build every view that has upstream data.
pub fn build_views<T: CachedRecord>(
  views: &[DerivedView<T>],
  fetched: &NamespaceData<T>,
) -> NamespaceData<T> {
  views
    .iter()
    .filter_map(|view| view.build(fetched).map(|entry| (view.target.clone(), entry)))
    .collect()
}
