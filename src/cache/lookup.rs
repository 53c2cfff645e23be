//! Lookup API over one cached namespace.
//!
//! This is what application code calls. Every method reads the namespace
//! through the [`CacheLayer`], so the first call after a miss populates it and
//! later calls are served from storage.
//!
//! Each lookup comes in two forms. The plain form fails with
//! [`RefDataError::DataNotFound`] when a key is absent, for configuration the
//! caller cannot do without. The `safe_` form logs a warning and yields an
//! empty result instead, for optional data on user-facing paths. Back office
//! failures propagate from both forms.

use std::collections::BTreeMap;
use tracing::warn;

use super::adapter::SourceAdapter;
use super::key::CacheKey;
use super::layer::CacheLayer;
use super::traits::{CacheEntry, CachedRecord, NamespaceData};
use crate::error::{RefDataError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnMissing {
  Fail,
  Empty,
}

/// Cached, keyed access to the records produced by one adapter.
pub struct CachedLookup<A: SourceAdapter> {
  adapter: A,
  cache: CacheLayer,
}

impl<A: SourceAdapter> CachedLookup<A> {
  pub fn new(adapter: A, cache: CacheLayer) -> Self {
    Self { adapter, cache }
  }

  pub fn namespace(&self) -> &'static str {
    A::Record::namespace()
  }

  pub fn adapter(&self) -> &A {
    &self.adapter
  }

  /// Entry for a key; fails when the key is absent.
  pub async fn lookup(
    &self,
    domain: &str,
    service: &str,
    workplace: &str,
  ) -> Result<CacheEntry<A::Record>> {
    self
      .lookup_key(CacheKey::new(domain, service, workplace), OnMissing::Fail)
      .await
  }

  /// Entry for a key; empty when the key is absent.
  pub async fn safe_lookup(
    &self,
    domain: &str,
    service: &str,
    workplace: &str,
  ) -> Result<CacheEntry<A::Record>> {
    self
      .lookup_key(CacheKey::new(domain, service, workplace), OnMissing::Empty)
      .await
  }

  /// One coded record; fails when either the key or the code is absent.
  pub async fn lookup_code(
    &self,
    domain: &str,
    service: &str,
    workplace: &str,
    code: &str,
  ) -> Result<A::Record> {
    let key = CacheKey::new(domain, service, workplace);
    let entry = self.lookup_key(key.clone(), OnMissing::Fail).await?;
    entry
      .get(code)
      .cloned()
      .ok_or_else(|| self.not_found(vec![key]))
  }

  /// Entries for several keys from a single namespace read.
  ///
  /// Fails once, naming every absent key, if any key is absent.
  pub async fn lookup_multiple(
    &self,
    keys: &[CacheKey],
  ) -> Result<BTreeMap<CacheKey, CacheEntry<A::Record>>> {
    self.lookup_keys(keys, OnMissing::Fail).await
  }

  /// Entries for several keys from a single namespace read. Absent keys map to
  /// empty entries and are reported in one warning.
  pub async fn safe_lookup_multiple(
    &self,
    keys: &[CacheKey],
  ) -> Result<BTreeMap<CacheKey, CacheEntry<A::Record>>> {
    self.lookup_keys(keys, OnMissing::Empty).await
  }

  /// Records for a key in sort order; fails when the key is absent.
  pub async fn list(&self, domain: &str, service: &str, workplace: &str) -> Result<Vec<A::Record>> {
    Ok(self.lookup(domain, service, workplace).await?.into_sorted())
  }

  /// Records for a key in sort order; empty when the key is absent.
  pub async fn safe_list(
    &self,
    domain: &str,
    service: &str,
    workplace: &str,
  ) -> Result<Vec<A::Record>> {
    Ok(self.safe_lookup(domain, service, workplace).await?.into_sorted())
  }

  pub async fn list_multiple(
    &self,
    keys: &[CacheKey],
  ) -> Result<BTreeMap<CacheKey, Vec<A::Record>>> {
    Ok(sorted_lists(self.lookup_multiple(keys).await?))
  }

  pub async fn safe_list_multiple(
    &self,
    keys: &[CacheKey],
  ) -> Result<BTreeMap<CacheKey, Vec<A::Record>>> {
    Ok(sorted_lists(self.safe_lookup_multiple(keys).await?))
  }

  /// The whole namespace, populating it if needed.
  pub async fn all(&self) -> Result<NamespaceData<A::Record>> {
    self.cache.get_or_populate(&self.adapter).await
  }

  /// Re-fetch the namespace and overwrite the cached copy.
  pub async fn refresh(&self) -> Result<NamespaceData<A::Record>> {
    self.cache.refresh(&self.adapter).await
  }

  pub fn clear(&self) -> Result<()> {
    self.cache.clear(self.namespace())
  }

  async fn lookup_key(
    &self,
    key: CacheKey,
    on_missing: OnMissing,
  ) -> Result<CacheEntry<A::Record>> {
    let mut data = self.all().await?;
    match data.remove(&key) {
      Some(entry) => Ok(entry),
      None => self.missing(vec![key], on_missing).map(|_| CacheEntry::empty()),
    }
  }

  async fn lookup_keys(
    &self,
    keys: &[CacheKey],
    on_missing: OnMissing,
  ) -> Result<BTreeMap<CacheKey, CacheEntry<A::Record>>> {
    let mut data = self.all().await?;
    let mut found = BTreeMap::new();
    let mut missing = Vec::new();

    for key in keys {
      match data.remove(key) {
        Some(entry) => {
          found.insert(key.clone(), entry);
        }
        // Repeated keys were already handled by an earlier iteration
        None if found.contains_key(key) || missing.contains(key) => {}
        None => missing.push(key.clone()),
      }
    }

    if !missing.is_empty() {
      self.missing(missing.clone(), on_missing)?;
      for key in missing {
        found.entry(key).or_insert_with(CacheEntry::empty);
      }
    }

    Ok(found)
  }

  fn missing(&self, keys: Vec<CacheKey>, on_missing: OnMissing) -> Result<()> {
    match on_missing {
      OnMissing::Fail => Err(self.not_found(keys)),
      OnMissing::Empty => {
        let keys: Vec<String> = keys.iter().map(CacheKey::composite).collect();
        warn!(namespace = self.namespace(), ?keys, "reference data not found");
        Ok(())
      }
    }
  }

  fn not_found(&self, keys: Vec<CacheKey>) -> RefDataError {
    RefDataError::DataNotFound {
      namespace: self.namespace(),
      keys,
    }
  }
}

fn sorted_lists<T: CachedRecord>(
  entries: BTreeMap<CacheKey, CacheEntry<T>>,
) -> BTreeMap<CacheKey, Vec<T>> {
  entries
    .into_iter()
    .map(|(key, entry)| (key, entry.into_sorted()))
    .collect()
}
