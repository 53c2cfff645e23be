//! Cache layer that orchestrates storage with back office fetching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::adapter::{fetch_namespace, SourceAdapter};
use super::storage::CacheStorage;
use super::traits::{CachedRecord, NamespaceData};
use crate::error::Result;

/// Cache layer that owns the namespace -> key -> entry mapping.
///
/// A namespace is always read, written and replaced as a whole. On a miss the
/// namespace's adapter is run and its complete output is stored in one write.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// One async lock per namespace so concurrent misses fetch once
  populating: Arc<Mutex<HashMap<&'static str, Arc<tokio::sync::Mutex<()>>>>>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self::from_shared(Arc::new(storage))
  }

  pub fn from_shared(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      populating: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Return the cached namespace, populating it from the adapter on a miss.
  pub async fn get_or_populate<A: SourceAdapter>(
    &self,
    adapter: &A,
  ) -> Result<NamespaceData<A::Record>> {
    let namespace = A::Record::namespace();

    if let Some(data) = self.read::<A::Record>()? {
      debug!(namespace, "cache hit");
      return Ok(data);
    }

    let lock = self.populate_lock(namespace);
    let _guard = lock.lock().await;

    // Another task may have populated while we waited
    if let Some(data) = self.read::<A::Record>()? {
      debug!(namespace, "populated by concurrent caller");
      return Ok(data);
    }

    debug!(namespace, "cache miss");
    self.populate(adapter).await
  }

  /// Fetch the namespace afresh and overwrite whatever is stored.
  pub async fn refresh<A: SourceAdapter>(&self, adapter: &A) -> Result<NamespaceData<A::Record>> {
    let lock = self.populate_lock(A::Record::namespace());
    let _guard = lock.lock().await;
    self.populate(adapter).await
  }

  /// Drop a namespace so the next read fetches it again.
  pub fn clear(&self, namespace: &str) -> Result<()> {
    self.storage.delete(namespace)?;
    info!(namespace, "cache cleared");
    Ok(())
  }

  async fn populate<A: SourceAdapter>(&self, adapter: &A) -> Result<NamespaceData<A::Record>> {
    let namespace = A::Record::namespace();
    let data = fetch_namespace(adapter).await?;

    let blob = serde_json::to_vec(&data)?;
    self.storage.set(namespace, &blob)?;

    info!(namespace, keys = data.len(), "cache populated");
    Ok(data)
  }

  fn read<T: CachedRecord>(&self) -> Result<Option<NamespaceData<T>>> {
    let namespace = T::namespace();
    let Some(blob) = self.storage.get(namespace)? else {
      return Ok(None);
    };

    match serde_json::from_slice(&blob) {
      Ok(data) => Ok(Some(data)),
      Err(e) => {
        // Written by an older record layout; rebuild rather than fail
        warn!(namespace, error = %e, "discarding undecodable cache entry");
        Ok(None)
      }
    }
  }

  fn populate_lock(&self, namespace: &'static str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self
      .populating
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(namespace).or_default())
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      populating: Arc::clone(&self.populating),
    }
  }
}
